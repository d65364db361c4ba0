use crate::error::Error;
use log::{debug, warn};
use std::ops::{Deref, DerefMut};

/// Backing store of a live buffer plus its read index and occupancy.
///
/// Valid bytes are `storage[(head + i) % capacity]` for `i` in `0..len`.
#[derive(Debug, Clone)]
struct Ring {
    storage: Box<[u8]>,
    head: usize,
    len: usize,
}

impl Ring {
    fn allocate(capacity: usize) -> Result<Self, Error> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| Error::AllocationFailure)?;
        storage.resize(capacity, 0);
        Ok(Self {
            storage: storage.into_boxed_slice(),
            head: 0,
            len: 0,
        })
    }

    fn capacity(&self) -> usize {
        self.storage.len()
    }

    fn tail(&self) -> usize {
        (self.head + self.len) % self.capacity()
    }

    fn advance_head(&mut self, by: usize) {
        self.head = (self.head + by) % self.capacity();
    }

    /// Copy `data` into the ring starting at `pos`, wrapping at most once.
    fn write_from(&mut self, pos: usize, data: &[u8]) {
        debug_assert!(data.len() <= self.capacity());
        let first = data.len().min(self.capacity() - pos);
        self.storage[pos..pos + first].copy_from_slice(&data[..first]);
        self.storage[..data.len() - first].copy_from_slice(&data[first..]);
    }

    /// Fill `out` from the ring starting at `pos`, wrapping at most once.
    fn read_into(&self, pos: usize, out: &mut [u8]) {
        debug_assert!(out.len() <= self.capacity());
        let first = out.len().min(self.capacity() - pos);
        let second = out.len() - first;
        out[..first].copy_from_slice(&self.storage[pos..pos + first]);
        out[first..].copy_from_slice(&self.storage[..second]);
    }

    fn push(&mut self, value: u8) {
        if self.len < self.capacity() {
            let tail = self.tail();
            self.storage[tail] = value;
            self.len += 1;
        } else {
            // Full: the slot at head is the oldest byte and also the tail.
            self.storage[self.head] = value;
            self.advance_head(1);
        }
    }

    fn push_many(&mut self, data: &[u8]) -> usize {
        let cap = self.capacity();
        let n = data.len();

        if n >= cap {
            self.storage.copy_from_slice(&data[n - cap..]);
            self.head = 0;
            self.len = cap;
            return n;
        }

        let tail = self.tail();
        self.write_from(tail, data);

        let overflow = (self.len + n).saturating_sub(cap);
        self.advance_head(overflow);
        self.len = (self.len + n).min(cap);
        n
    }

    fn push_many_no_overwrite(&mut self, data: &[u8]) -> usize {
        let free = self.capacity() - self.len;
        let accepted = &data[data.len() - data.len().min(free)..];
        let tail = self.tail();
        self.write_from(tail, accepted);
        self.len += accepted.len();
        accepted.len()
    }

    fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let value = self.storage[self.head];
        self.advance_head(1);
        self.len -= 1;
        Some(value)
    }

    /// Remove up to `n` bytes, copying them into `out` when a sink is given.
    fn take(&mut self, out: Option<&mut [u8]>, n: usize) -> usize {
        let n = n.min(self.len);
        if let Some(out) = out {
            self.read_into(self.head, &mut out[..n]);
        }
        self.advance_head(n);
        self.len -= n;
        n
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        (offset < self.len).then(|| self.storage[(self.head + offset) % self.capacity()])
    }

    fn peek_many(&self, from: usize, out: Option<&mut [u8]>, n: usize) -> Option<usize> {
        if from >= self.len {
            return None;
        }
        let n = n.min(self.len - from);
        if let Some(out) = out {
            self.read_into((self.head + from) % self.capacity(), &mut out[..n]);
        }
        Some(n)
    }

    fn as_slices(&self) -> (&[u8], &[u8]) {
        let cap = self.capacity();
        if self.len <= cap - self.head {
            (&self.storage[self.head..self.head + self.len], &[])
        } else {
            let first = cap - self.head;
            (&self.storage[self.head..], &self.storage[..self.len - first])
        }
    }
}

/// Scope of one mutating operation. Holding it means the busy flag is set;
/// dropping it clears the flag on every exit path.
struct Busy<'a> {
    ring: &'a mut Ring,
    busy: &'a mut bool,
}

impl Deref for Busy<'_> {
    type Target = Ring;

    fn deref(&self) -> &Ring {
        &*self.ring
    }
}

impl DerefMut for Busy<'_> {
    fn deref_mut(&mut self) -> &mut Ring {
        &mut *self.ring
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        *self.busy = false;
    }
}

/// Fixed-capacity circular byte buffer for staging byte streams.
///
/// Two overflow policies are offered side by side: the plain `push*`
/// operations overwrite the oldest bytes when full, the `*_no_overwrite`
/// variants refuse what does not fit.
///
/// The busy flag is a misuse detector, not a lock. Mutating methods already
/// require `&mut self`; the flag additionally lets a caller reserve the
/// instance with [`try_acquire`](Self::try_acquire) so that every mutating
/// call fails with [`Error::ReentrantAccess`] until [`release`](Self::release).
/// To share a buffer between tasks, wrap it in a mutex.
#[derive(Debug, Clone, Default)]
pub struct CircularBuffer {
    ring: Option<Ring>,
    busy: bool,
}

impl CircularBuffer {
    /// Allocate a buffer holding up to `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        let mut buf = Self::uninit();
        buf.init(capacity)?;
        Ok(buf)
    }

    /// An instance with no backing store. Queries report zero/false and
    /// mutating calls fail with [`Error::NotInitialized`] until [`init`](Self::init).
    pub const fn uninit() -> Self {
        Self {
            ring: None,
            busy: false,
        }
    }

    pub fn init(&mut self, capacity: usize) -> Result<(), Error> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        if self.ring.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        self.ring = Some(Ring::allocate(capacity)?);
        self.busy = false;
        debug!("circular buffer initialized with {} bytes", capacity);
        Ok(())
    }

    /// Release the backing store. Destroying an uninitialized buffer is a no-op.
    /// A buffer reserved with [`try_acquire`](Self::try_acquire) is left intact.
    pub fn destroy(&mut self) -> Result<(), Error> {
        if self.busy {
            warn!("refusing to destroy a busy circular buffer");
            return Err(Error::ReentrantAccess);
        }
        if let Some(ring) = self.ring.take() {
            debug!("circular buffer of {} bytes destroyed", ring.capacity());
        }
        Ok(())
    }

    pub fn is_init(&self) -> bool {
        self.ring.is_some()
    }

    /// Mark the buffer busy. Fails if it is uninitialized or already busy.
    pub fn try_acquire(&mut self) -> Result<(), Error> {
        if self.ring.is_none() {
            return Err(Error::NotInitialized);
        }
        if self.busy {
            warn!("circular buffer is already in use");
            return Err(Error::ReentrantAccess);
        }
        self.busy = true;
        Ok(())
    }

    pub fn release(&mut self) {
        self.busy = false;
    }

    fn enter(&mut self) -> Result<Busy<'_>, Error> {
        let ring = self.ring.as_mut().ok_or(Error::NotInitialized)?;
        if self.busy {
            warn!("rejected overlapping operation on a busy circular buffer");
            return Err(Error::ReentrantAccess);
        }
        self.busy = true;
        Ok(Busy {
            ring,
            busy: &mut self.busy,
        })
    }

    fn ring(&self) -> Result<&Ring, Error> {
        self.ring.as_ref().ok_or(Error::NotInitialized)
    }

    /// Drop all bytes. The storage is left as is, only the indices reset.
    pub fn clear(&mut self) -> Result<(), Error> {
        let mut ring = self.enter()?;
        ring.head = 0;
        ring.len = 0;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ring.as_ref().map_or(0, |r| r.len)
    }

    pub fn capacity(&self) -> usize {
        self.ring.as_ref().map_or(0, Ring::capacity)
    }

    /// Free space in bytes.
    pub fn available(&self) -> usize {
        self.capacity() - self.len()
    }

    /// `false` on an uninitialized buffer, matching the other neutral queries.
    pub fn is_empty(&self) -> bool {
        self.ring.as_ref().is_some_and(|r| r.len == 0)
    }

    pub fn is_full(&self) -> bool {
        self.ring.as_ref().is_some_and(|r| r.len == r.capacity())
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Append one byte, overwriting the oldest one when full.
    pub fn push(&mut self, value: u8) -> Result<(), Error> {
        self.enter()?.push(value);
        Ok(())
    }

    /// Append one byte, or fail with [`Error::BufferFull`] leaving the buffer untouched.
    pub fn push_no_overwrite(&mut self, value: u8) -> Result<(), Error> {
        let mut ring = self.enter()?;
        if ring.len == ring.capacity() {
            return Err(Error::BufferFull);
        }
        ring.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u8, Error> {
        self.enter()?.pop().ok_or(Error::BufferEmpty)
    }

    /// Read the byte `offset` positions after the oldest one without removing it.
    pub fn peek(&self, offset: usize) -> Result<u8, Error> {
        self.ring()?.peek(offset).ok_or(Error::OffsetOutOfRange)
    }

    /// Append all of `data`, overwriting the oldest bytes as needed.
    ///
    /// Input at least as long as the capacity replaces the whole content with
    /// its last `capacity` bytes and resets the head to zero. Returns
    /// `data.len()`: every byte is accepted even if it is immediately
    /// overwritten by a later one.
    pub fn push_many(&mut self, data: &[u8]) -> Result<usize, Error> {
        if data.is_empty() {
            return Ok(0);
        }
        Ok(self.enter()?.push_many(data))
    }

    /// Append as much of `data` as fits. When it does not all fit, the
    /// *last* `available()` bytes are kept and the leading excess is dropped.
    /// Returns the number of bytes written.
    pub fn push_many_no_overwrite(&mut self, data: &[u8]) -> Result<usize, Error> {
        if data.is_empty() {
            return Ok(0);
        }
        Ok(self.enter()?.push_many_no_overwrite(data))
    }

    /// Remove up to `out.len()` bytes into `out`, oldest first.
    pub fn pop_many(&mut self, out: &mut [u8]) -> Result<usize, Error> {
        if out.is_empty() {
            return Ok(0);
        }
        let n = out.len();
        Ok(self.enter()?.take(Some(out), n))
    }

    /// Remove up to `n` bytes without copying them anywhere.
    pub fn discard(&mut self, n: usize) -> Result<usize, Error> {
        if n == 0 {
            return Ok(0);
        }
        Ok(self.enter()?.take(None, n))
    }

    /// Copy up to `out.len()` bytes starting `from` positions after the
    /// oldest byte, without removing them.
    pub fn peek_many(&self, from: usize, out: &mut [u8]) -> Result<usize, Error> {
        if out.is_empty() {
            return Ok(0);
        }
        let n = out.len();
        self.ring()?
            .peek_many(from, Some(out), n)
            .ok_or(Error::OffsetOutOfRange)
    }

    /// Number of bytes `peek_many(from, ..)` would produce for a sink of `n` bytes.
    pub fn peek_len(&self, from: usize, n: usize) -> Result<usize, Error> {
        if n == 0 {
            return Ok(0);
        }
        self.ring()?
            .peek_many(from, None, n)
            .ok_or(Error::OffsetOutOfRange)
    }

    /// The valid bytes in logical order as at most two slices.
    pub fn as_slices(&self) -> (&[u8], &[u8]) {
        match &self.ring {
            Some(ring) => ring.as_slices(),
            None => (&[], &[]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn contents(buf: &CircularBuffer) -> Vec<u8> {
        let (a, b) = buf.as_slices();
        [a, b].concat()
    }

    fn state(buf: &CircularBuffer) -> (usize, usize, Vec<u8>) {
        let ring = buf.ring.as_ref().unwrap();
        (ring.head, ring.len, ring.storage.to_vec())
    }

    fn assert_invariants(buf: &CircularBuffer) {
        let ring = buf.ring.as_ref().unwrap();
        assert!(ring.len <= ring.capacity());
        assert!(ring.head < ring.capacity());
        assert!(!buf.busy);
    }

    #[test]
    fn test_overwrite_single() {
        let mut buf = CircularBuffer::new(4).unwrap();
        for b in b"ABCD" {
            buf.push(*b).unwrap();
        }
        assert!(buf.is_full());

        buf.push(b'E').unwrap();
        assert_eq!(contents(&buf), b"BCDE");
        assert_eq!(buf.pop().unwrap(), b'B');
        assert_eq!(contents(&buf), b"CDE");
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_push_many_longer_than_capacity() {
        let mut buf = CircularBuffer::new(4).unwrap();
        buf.push(b'x').unwrap();
        buf.pop().unwrap();

        assert_eq!(buf.push_many(b"ABCDE").unwrap(), 5);
        assert_eq!(contents(&buf), b"BCDE");
        assert_eq!(state(&buf), (0, 4, b"BCDE".to_vec()));
    }

    #[test]
    fn test_push_many_no_overwrite_on_full() {
        let mut buf = CircularBuffer::new(4).unwrap();
        buf.push_many(b"ABCD").unwrap();

        assert_eq!(buf.push_many_no_overwrite(b"XY").unwrap(), 0);
        assert_eq!(contents(&buf), b"ABCD");
    }

    #[test]
    fn test_push_many_no_overwrite_keeps_newest() {
        let mut buf = CircularBuffer::new(5).unwrap();
        buf.push_many(b"AB").unwrap();

        assert_eq!(buf.push_many_no_overwrite(b"WXYZ").unwrap(), 3);
        assert_eq!(contents(&buf), b"ABXYZ");
        assert!(buf.is_full());
    }

    #[test]
    fn test_push_no_overwrite_full() {
        let mut buf = CircularBuffer::new(2).unwrap();
        buf.push_no_overwrite(1).unwrap();
        buf.push_no_overwrite(2).unwrap();

        assert_eq!(buf.push_no_overwrite(3), Err(Error::BufferFull));
        assert_eq!(contents(&buf), [1, 2]);
        assert!(!buf.is_busy());
    }

    #[test]
    fn test_push_many_partial_overflow() {
        let mut buf = CircularBuffer::new(5).unwrap();
        buf.push_many(b"ABC").unwrap();

        assert_eq!(buf.push_many(b"DEFG").unwrap(), 4);
        assert_eq!(contents(&buf), b"CDEFG");
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn test_pop_many_wraparound() {
        let mut buf = CircularBuffer::new(5).unwrap();
        buf.push_many(b"12345").unwrap();
        assert_eq!(buf.discard(3).unwrap(), 3);
        buf.push_many(b"ab").unwrap();

        let (first, second) = buf.as_slices();
        assert_eq!(first, b"45");
        assert_eq!(second, b"ab");

        let mut out = [0u8; 10];
        assert_eq!(buf.pop_many(&mut out).unwrap(), 4);
        assert_eq!(&out[..4], b"45ab");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_pop_empty() {
        let mut buf = CircularBuffer::new(3).unwrap();
        assert_eq!(buf.pop(), Err(Error::BufferEmpty));
        assert_eq!(buf.discard(5).unwrap(), 0);
        // Failure paths must still release the guard.
        buf.push(7).unwrap();
        assert_eq!(buf.pop().unwrap(), 7);
    }

    #[test]
    fn test_peek_does_not_mutate() {
        let mut buf = CircularBuffer::new(4).unwrap();
        buf.push_many(b"ABCDEF").unwrap();
        buf.discard(1).unwrap();
        buf.push(b'G').unwrap();
        let before = state(&buf);

        assert_eq!(buf.peek(0).unwrap(), b'D');
        assert_eq!(buf.peek(3).unwrap(), b'G');
        assert_eq!(buf.peek(4), Err(Error::OffsetOutOfRange));

        let mut out = [0u8; 8];
        assert_eq!(buf.peek_many(1, &mut out).unwrap(), 3);
        assert_eq!(&out[..3], b"EFG");
        assert_eq!(buf.peek_len(2, 100).unwrap(), 2);
        assert_eq!(buf.peek_len(4, 1), Err(Error::OffsetOutOfRange));

        assert_eq!(state(&buf), before);
    }

    #[test]
    fn test_peek_many_offset_out_of_range() {
        let mut buf = CircularBuffer::new(8).unwrap();
        buf.push_many(b"abc").unwrap();
        let before = state(&buf);

        let mut out = [0u8; 1];
        assert_eq!(buf.peek_many(10, &mut out), Err(Error::OffsetOutOfRange));
        assert_eq!(state(&buf), before);
    }

    #[test]
    fn test_zero_length_calls() {
        let mut uninit = CircularBuffer::uninit();
        assert_eq!(uninit.push_many(&[]).unwrap(), 0);
        assert_eq!(uninit.pop_many(&mut []).unwrap(), 0);
        assert_eq!(uninit.discard(0).unwrap(), 0);
        assert_eq!(uninit.peek_len(3, 0).unwrap(), 0);

        let mut buf = CircularBuffer::new(2).unwrap();
        assert_eq!(buf.push_many_no_overwrite(&[]).unwrap(), 0);
        assert_eq!(buf.peek_many(5, &mut []).unwrap(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_lifecycle() {
        assert_eq!(CircularBuffer::new(0).unwrap_err(), Error::InvalidCapacity);

        let mut buf = CircularBuffer::new(3).unwrap();
        assert!(buf.is_init());
        assert_eq!(buf.init(3), Err(Error::AlreadyInitialized));

        buf.destroy().unwrap();
        assert!(!buf.is_init());
        buf.destroy().unwrap();

        assert_eq!(buf.push(1), Err(Error::NotInitialized));
        assert_eq!(buf.pop(), Err(Error::NotInitialized));
        assert_eq!(buf.peek(0), Err(Error::NotInitialized));
        assert_eq!(buf.clear(), Err(Error::NotInitialized));
        assert_eq!(buf.try_acquire(), Err(Error::NotInitialized));
        assert_eq!(buf.push_many(b"ab"), Err(Error::NotInitialized));
        assert_eq!(buf.push_many_no_overwrite(b"ab"), Err(Error::NotInitialized));
        assert_eq!(buf.pop_many(&mut [0; 2]), Err(Error::NotInitialized));
        assert_eq!(buf.discard(2), Err(Error::NotInitialized));
        assert_eq!(buf.peek_many(0, &mut [0; 2]), Err(Error::NotInitialized));
        assert_eq!(buf.peek_len(0, 2), Err(Error::NotInitialized));
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), 0);
        assert!(!buf.is_empty());
        assert!(!buf.is_full());
        assert!(!buf.is_busy());
        assert_eq!(buf.as_slices(), (&[][..], &[][..]));

        buf.init(5).unwrap();
        assert_eq!(buf.capacity(), 5);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_allocation_failure_leaves_uninit() {
        let mut buf = CircularBuffer::uninit();
        assert_eq!(buf.init(usize::MAX), Err(Error::AllocationFailure));
        assert!(!buf.is_init());
        assert_eq!(buf.push(1), Err(Error::NotInitialized));
    }

    #[test]
    fn test_clear_keeps_storage() {
        let mut buf = CircularBuffer::new(4).unwrap();
        buf.push_many(b"ABCDEF").unwrap();
        buf.discard(1).unwrap();
        let (_, _, storage) = state(&buf);

        buf.clear().unwrap();
        assert_eq!(state(&buf), (0, 0, storage));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_busy_rejects_mutation() {
        let mut buf = CircularBuffer::new(4).unwrap();
        buf.push_many(b"AB").unwrap();
        buf.busy = true;
        let before = state(&buf);

        assert_eq!(buf.push(1), Err(Error::ReentrantAccess));
        assert_eq!(buf.push_no_overwrite(1), Err(Error::ReentrantAccess));
        assert_eq!(buf.pop(), Err(Error::ReentrantAccess));
        assert_eq!(buf.push_many(b"xy"), Err(Error::ReentrantAccess));
        assert_eq!(buf.push_many_no_overwrite(b"xy"), Err(Error::ReentrantAccess));
        assert_eq!(buf.pop_many(&mut [0; 2]), Err(Error::ReentrantAccess));
        assert_eq!(buf.discard(1), Err(Error::ReentrantAccess));
        assert_eq!(buf.clear(), Err(Error::ReentrantAccess));
        assert_eq!(state(&buf), before);
        assert!(buf.is_busy());

        // Readers do not take the guard.
        assert_eq!(buf.peek(1).unwrap(), b'B');
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_destroy_reserved_buffer() {
        let mut buf = CircularBuffer::new(4).unwrap();
        buf.push_many(b"AB").unwrap();
        buf.try_acquire().unwrap();

        assert_eq!(buf.destroy(), Err(Error::ReentrantAccess));
        assert!(buf.is_init());
        assert!(buf.is_busy());
        assert_eq!(buf.peek(1).unwrap(), b'B');

        buf.release();
        buf.destroy().unwrap();
        assert!(!buf.is_init());
    }

    #[test]
    fn test_acquire_release() {
        let mut buf = CircularBuffer::new(4).unwrap();
        buf.try_acquire().unwrap();
        assert_eq!(buf.try_acquire(), Err(Error::ReentrantAccess));
        assert_eq!(buf.push(1), Err(Error::ReentrantAccess));

        buf.release();
        buf.release();
        buf.push(1).unwrap();
        assert_eq!(buf.len(), 1);
        assert!(!buf.is_busy());
    }

    #[test]
    fn test_fifo_order() {
        let mut buf = CircularBuffer::new(16).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let n = rng.gen_range(0..=16);
            let data: Vec<u8> = (0..n).map(|_| rng.gen()).collect();
            for b in &data {
                buf.push_no_overwrite(*b).unwrap();
            }
            let popped: Vec<u8> = (0..n).map(|_| buf.pop().unwrap()).collect();
            assert_eq!(popped, data);
        }
    }

    fn random_buffer(rng: &mut StdRng, capacity: usize) -> CircularBuffer {
        let mut buf = CircularBuffer::new(capacity).unwrap();
        let fill: Vec<u8> = (0..rng.gen_range(0..capacity * 2)).map(|_| rng.gen()).collect();
        buf.push_many(&fill).unwrap();
        buf.discard(rng.gen_range(0..=capacity)).unwrap();
        buf
    }

    #[test]
    fn test_bulk_single_equivalence() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let capacity = rng.gen_range(1..12);
            let start = random_buffer(&mut rng, capacity);
            let data: Vec<u8> = (0..rng.gen_range(0..capacity * 3)).map(|_| rng.gen()).collect();

            let mut single = start.clone();
            for b in &data {
                single.push(*b).unwrap();
            }
            let mut bulk = start.clone();
            assert_eq!(bulk.push_many(&data).unwrap(), data.len());

            assert_eq!(contents(&bulk), contents(&single));
            if data.len() < capacity {
                assert_eq!(state(&bulk), state(&single));
            }
            assert_invariants(&bulk);

            // No-overwrite: same accepted count as single pushes until full.
            let mut single = start.clone();
            let accepted = data
                .iter()
                .take_while(|b| single.push_no_overwrite(**b).is_ok())
                .count();
            let mut bulk = start.clone();
            assert_eq!(bulk.push_many_no_overwrite(&data).unwrap(), accepted);
            assert_eq!(bulk.len(), single.len());
            assert_eq!(&contents(&bulk)[..start.len()], contents(&start).as_slice());
            assert_eq!(&contents(&bulk)[start.len()..], &data[data.len() - accepted..]);
        }
    }

    #[test]
    fn test_random_ops_keep_invariants() {
        let mut rng = StdRng::seed_from_u64(1234);
        let capacity = 9;
        let mut buf = CircularBuffer::new(capacity).unwrap();
        let mut model: std::collections::VecDeque<u8> = Default::default();

        for _ in 0..5000 {
            match rng.gen_range(0..7) {
                0 => {
                    let b = rng.gen();
                    buf.push(b).unwrap();
                    if model.len() == capacity {
                        model.pop_front();
                    }
                    model.push_back(b);
                }
                1 => {
                    let b = rng.gen();
                    let ok = buf.push_no_overwrite(b).is_ok();
                    assert_eq!(ok, model.len() < capacity);
                    if ok {
                        model.push_back(b);
                    }
                }
                2 => assert_eq!(buf.pop().ok(), model.pop_front()),
                3 => {
                    let data: Vec<u8> = (0..rng.gen_range(0..20)).map(|_| rng.gen()).collect();
                    buf.push_many(&data).unwrap();
                    model.extend(&data);
                    while model.len() > capacity {
                        model.pop_front();
                    }
                }
                4 => {
                    let mut out = vec![0u8; rng.gen_range(0..12)];
                    let n = buf.pop_many(&mut out).unwrap();
                    let expected: Vec<u8> = model.drain(..n.min(model.len())).collect();
                    assert_eq!(&out[..n], expected.as_slice());
                }
                5 => {
                    let from = rng.gen_range(0..capacity);
                    let mut out = vec![0u8; rng.gen_range(1..12)];
                    match buf.peek_many(from, &mut out) {
                        Ok(n) => {
                            let expected: Vec<u8> = model.iter().skip(from).take(n).copied().collect();
                            assert_eq!(&out[..n], expected.as_slice());
                            assert_eq!(n, out.len().min(model.len() - from));
                        }
                        Err(e) => {
                            assert_eq!(e, Error::OffsetOutOfRange);
                            assert!(from >= model.len());
                        }
                    }
                }
                _ => {
                    let data: Vec<u8> = (0..rng.gen_range(0..20)).map(|_| rng.gen()).collect();
                    let free = capacity - model.len();
                    assert_eq!(buf.push_many_no_overwrite(&data).unwrap(), data.len().min(free));
                    model.extend(&data[data.len() - data.len().min(free)..]);
                }
            }
            assert_invariants(&buf);
            assert_eq!(contents(&buf), model.iter().copied().collect::<Vec<u8>>());
        }
    }
}
