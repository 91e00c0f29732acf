// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Fixed-capacity window of samples. Pushing into a full window overwrites the oldest
/// sample; nothing allocates after construction.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    samples: Box<[f64]>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { samples: vec![0.0; capacity.max(1)].into_boxed_slice(), head: 0, len: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, value: f64) {
        let cap = self.capacity();
        let slot = (self.head + self.len) % cap;
        self.samples[slot] = value;
        if self.len == cap {
            self.head = (self.head + 1) % cap;
        } else {
            self.len += 1;
        }
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let cap = self.capacity();
        (0..self.len).map(move |i| self.samples[(self.head + i) % cap])
    }

    pub fn last(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        Some(self.samples[(self.head + self.len - 1) % self.capacity()])
    }

    pub fn mean(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        Some(self.iter().sum::<f64>() / self.len as f64)
    }

    /// Least-squares slope of the samples against their position in the window, in units
    /// per sample. Zero for fewer than two samples.
    pub fn slope(&self) -> f64 {
        if self.len < 2 {
            return 0.0;
        }
        let n = self.len as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = self.iter().sum::<f64>() / n;
        let (mut num, mut den) = (0.0, 0.0);
        for (i, y) in self.iter().enumerate() {
            let dx = i as f64 - mean_x;
            num += dx * (y - mean_y);
            den += dx * dx;
        }
        num / den
    }
}
