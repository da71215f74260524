/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Visitor-based binary serialization: a structure exposes its fields in
//! depth-first order through [`Visit::visit`], and the same listing drives
//! both [`Saver`] and [`Loader`]. Numbers are little-endian; vectors are
//! length-prefixed with a 64-bit size followed by element bytes.

use std::io::{Read, Write};

use anyhow::{Context, Result};

/// Implemented by every persistent structure of the index.
pub trait Visit {
    fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<()>;
}

/// One direction of a depth-first traversal: either writing fields out or
/// filling them in.
pub trait Visitor: Sized {
    fn u8(&mut self, x: &mut u8) -> Result<()>;
    fn u32(&mut self, x: &mut u32) -> Result<()>;
    fn u64(&mut self, x: &mut u64) -> Result<()>;
    fn vec_u8(&mut self, v: &mut Vec<u8>) -> Result<()>;
    fn vec_u32(&mut self, v: &mut Vec<u32>) -> Result<()>;
    fn vec_u64(&mut self, v: &mut Vec<u64>) -> Result<()>;

    /// A vector of sub-structures, length-prefixed like the primitive ones.
    fn vec<T: Visit + Default>(&mut self, v: &mut Vec<T>) -> Result<()> {
        let mut len = v.len() as u64;
        self.u64(&mut len)?;
        v.resize_with(len as usize, T::default);
        for item in v.iter_mut() {
            item.visit(self)?;
        }
        Ok(())
    }
}

/// Serializes a depth-first traversal to a [`Write`] stream.
pub struct Saver<W: Write> {
    writer: W,
}

impl<W: Write> Saver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

macro_rules! impl_save_prim {
    ($name:ident, $ty:ty) => {
        fn $name(&mut self, x: &mut $ty) -> Result<()> {
            self.writer
                .write_all(&x.to_le_bytes())
                .context("write failed")
        }
    };
}

macro_rules! impl_save_vec {
    ($name:ident, $ty:ty) => {
        fn $name(&mut self, v: &mut Vec<$ty>) -> Result<()> {
            let mut len = v.len() as u64;
            self.u64(&mut len)?;
            for x in v.iter() {
                self.writer
                    .write_all(&x.to_le_bytes())
                    .context("write failed")?;
            }
            Ok(())
        }
    };
}

impl<W: Write> Visitor for Saver<W> {
    impl_save_prim!(u8, u8);
    impl_save_prim!(u32, u32);
    impl_save_prim!(u64, u64);
    impl_save_vec!(vec_u8, u8);
    impl_save_vec!(vec_u32, u32);
    impl_save_vec!(vec_u64, u64);
}

/// Fills a depth-first traversal from a [`Read`] stream.
pub struct Loader<R: Read> {
    reader: R,
}

impl<R: Read> Loader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

macro_rules! impl_load_prim {
    ($name:ident, $ty:ty, $len:expr) => {
        fn $name(&mut self, x: &mut $ty) -> Result<()> {
            let mut buf = [0u8; $len];
            self.reader.read_exact(&mut buf).context("read failed")?;
            *x = <$ty>::from_le_bytes(buf);
            Ok(())
        }
    };
}

macro_rules! impl_load_vec {
    ($name:ident, $prim:ident, $ty:ty) => {
        fn $name(&mut self, v: &mut Vec<$ty>) -> Result<()> {
            let mut len = 0u64;
            self.u64(&mut len)?;
            v.clear();
            v.reserve(len as usize);
            for _ in 0..len {
                let mut x: $ty = 0;
                self.$prim(&mut x)?;
                v.push(x);
            }
            Ok(())
        }
    };
}

impl<R: Read> Visitor for Loader<R> {
    impl_load_prim!(u8, u8, 1);
    impl_load_prim!(u32, u32, 4);
    impl_load_prim!(u64, u64, 8);
    impl_load_vec!(vec_u8, u8, u8);
    impl_load_vec!(vec_u32, u32, u32);
    impl_load_vec!(vec_u64, u64, u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, PartialEq, Debug)]
    struct Toy {
        a: u32,
        v: Vec<u64>,
    }

    impl Visit for Toy {
        fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<()> {
            visitor.u32(&mut self.a)?;
            visitor.vec_u64(&mut self.v)
        }
    }

    #[test]
    fn roundtrip() -> Result<()> {
        let mut toy = Toy {
            a: 42,
            v: vec![1, 1 << 40, 3],
        };
        let mut saver = Saver::new(Vec::new());
        toy.visit(&mut saver)?;
        let bytes = saver.into_inner();
        // 4 (a) + 8 (len) + 24 (elements)
        assert_eq!(bytes.len(), 36);
        let mut back = Toy::default();
        back.visit(&mut Loader::new(&bytes[..]))?;
        assert_eq!(back, toy);
        Ok(())
    }
}
