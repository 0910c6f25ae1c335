//! Chunk planning for multipart uploads.
//!
//! A [`Chunks`] iterator partitions a byte range `[0, total)` into dense,
//! contiguous chunks suitable for multipart part uploads. Part numbers are
//! 1-based and dense, matching the multipart upload numbering used by
//! S3-compatible stores.

/// A single planned chunk of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based part number within the upload.
    pub part_number: u32,
    /// Byte offset of the chunk within the object.
    pub offset: u64,
    /// Byte length of the chunk.
    pub size: u64,
}

impl Chunk {
    /// The exclusive end offset of this chunk.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Lazy iterator over the chunks of an object of `total_size` bytes.
///
/// A `chunk_size` of zero, or one at least as large as the object, plans a
/// single chunk covering the whole object. An empty object still plans
/// exactly one empty chunk so that every layer has at least one part.
#[derive(Clone, Debug)]
pub struct Chunks {
    total: u64,
    chunk: u64,
    next_offset: u64,
    next_part: u32,
    done: bool,
}

impl Chunks {
    pub fn new(total_size: u64, chunk_size: u64) -> Self {
        let chunk = if chunk_size == 0 || chunk_size >= total_size {
            total_size
        } else {
            chunk_size
        };
        Chunks {
            total: total_size,
            chunk,
            next_offset: 0,
            next_part: 1,
            done: false,
        }
    }

    /// Number of chunks this plan will yield.
    pub fn num_chunks(&self) -> u64 {
        if self.total == 0 || self.chunk == 0 {
            1
        } else {
            self.total.div_ceil(self.chunk)
        }
    }
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.done {
            return None;
        }
        let remaining = self.total - self.next_offset;
        let size = if self.chunk == 0 { 0 } else { remaining.min(self.chunk) };
        let chunk = Chunk {
            part_number: self.next_part,
            offset: self.next_offset,
            size,
        };
        self.next_offset += size;
        self.next_part += 1;
        if self.next_offset >= self.total {
            self.done = true;
        }
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(total: u64, chunk: u64) -> Vec<Chunk> {
        Chunks::new(total, chunk).collect()
    }

    #[test]
    fn test_single_chunk_when_chunk_size_zero() {
        let chunks = collect(26, 0);
        assert_eq!(
            chunks,
            vec![Chunk {
                part_number: 1,
                offset: 0,
                size: 26
            }]
        );
    }

    #[test]
    fn test_single_chunk_when_chunk_size_covers_object() {
        assert_eq!(collect(10, 10).len(), 1);
        assert_eq!(collect(10, 100).len(), 1);
    }

    #[test]
    fn test_unit_chunks() {
        let chunks = collect(3, 1);
        assert_eq!(chunks.len(), 3);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.part_number, i as u32 + 1);
            assert_eq!(c.offset, i as u64);
            assert_eq!(c.size, 1);
        }
    }

    #[test]
    fn test_ragged_tail() {
        let chunks = collect(10, 4);
        assert_eq!(
            chunks,
            vec![
                Chunk {
                    part_number: 1,
                    offset: 0,
                    size: 4
                },
                Chunk {
                    part_number: 2,
                    offset: 4,
                    size: 4
                },
                Chunk {
                    part_number: 3,
                    offset: 8,
                    size: 2
                },
            ]
        );
    }

    #[test]
    fn test_empty_object_yields_one_empty_chunk() {
        let chunks = collect(0, 5);
        assert_eq!(
            chunks,
            vec![Chunk {
                part_number: 1,
                offset: 0,
                size: 0
            }]
        );
        assert_eq!(collect(0, 0), chunks);
    }

    #[test]
    fn test_chunks_cover_range_contiguously() {
        for (total, chunk) in [(1u64, 1u64), (26, 5), (26, 1), (1000, 7), (64, 16)] {
            let mut expected_offset = 0;
            let mut expected_part = 1;
            for c in Chunks::new(total, chunk) {
                assert_eq!(c.offset, expected_offset);
                assert_eq!(c.part_number, expected_part);
                expected_offset = c.end();
                expected_part += 1;
            }
            assert_eq!(expected_offset, total);
        }
    }

    #[test]
    fn test_num_chunks_matches_iteration() {
        for (total, chunk) in [(0u64, 0u64), (0, 3), (26, 0), (26, 1), (26, 5), (26, 26)] {
            let plan = Chunks::new(total, chunk);
            assert_eq!(plan.num_chunks(), plan.clone().count() as u64);
        }
    }

    #[test]
    fn test_restartable() {
        // A fresh plan over the same inputs yields the same chunks.
        let a: Vec<_> = Chunks::new(26, 7).collect();
        let b: Vec<_> = Chunks::new(26, 7).collect();
        assert_eq!(a, b);
    }
}
