/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Ordered table of reference names, stored as a char arena plus offsets.

use anyhow::Result;

use crate::serialize::{Visit, Visitor};

#[derive(Clone, Default, Debug)]
pub struct FilenameTable {
    offsets: Vec<u32>,
    chars: Vec<u8>,
}

impl FilenameTable {
    pub fn build<S: AsRef<str>>(names: &[S]) -> Self {
        let mut offsets = Vec::with_capacity(names.len() + 1);
        let mut chars = Vec::new();
        offsets.push(0);
        for name in names {
            chars.extend_from_slice(name.as_ref().as_bytes());
            offsets.push(chars.len() as u32);
        }
        Self { offsets, chars }
    }

    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> &str {
        let begin = self.offsets[i] as usize;
        let end = self.offsets[i + 1] as usize;
        std::str::from_utf8(&self.chars[begin..end]).expect("names are stored as UTF-8")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        (0..self.len()).map(|i| self.get(i))
    }

    pub fn num_bytes(&self) -> usize {
        16 + self.offsets.len() * 4 + self.chars.len()
    }
}

impl Visit for FilenameTable {
    fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.vec_u32(&mut self.offsets)?;
        visitor.vec_u8(&mut self.chars)
    }
}
