use mslice_storage::prelude::*;
use rand::Rng;
use std::fs;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Pair {
    high: i64,
    low: i64,
}

impl Record for Pair {
    const SIZE: usize = 16;

    fn encode(&self, buf: &mut [u8]) -> Result<()> {
        check_encode_len(buf, Self::SIZE)?;
        buf[..8].copy_from_slice(&self.high.to_le_bytes());
        buf[8..].copy_from_slice(&self.low.to_le_bytes());
        Ok(())
    }

    fn decode(&mut self, buf: &[u8]) -> Result<()> {
        check_decode_len(buf, Self::SIZE)?;
        self.high.decode(&buf[..8])?;
        self.low.decode(&buf[8..])
    }
}

/// Fails to encode once high reaches the limit.
#[derive(Debug, Default, Clone, Copy)]
struct Limited(u32);

impl Record for Limited {
    const SIZE: usize = 4;

    fn encode(&self, buf: &mut [u8]) -> Result<()> {
        if self.0 >= 3 {
            return Err(Error::Encode(format!("value {} rejected", self.0)));
        }
        self.0.encode(buf)
    }

    fn decode(&mut self, buf: &[u8]) -> Result<()> {
        self.0.decode(buf)
    }
}

#[test]
fn test_append_close_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pairs.bin");
    let mut arr = ArrayFile::<Pair>::create(&path, 0, 10).unwrap();
    assert_eq!(0, arr.len());
    assert_eq!(10, arr.cap());
    let mut want = vec![];
    for i in 0..10i64 {
        let p = Pair {
            high: (i + 1) * 100,
            low: i + 1,
        };
        arr.append(&[p]).unwrap();
        want.push(p);
    }
    assert_eq!(10, arr.len());
    arr.close().unwrap();
    assert_eq!(160, fs::metadata(&path).unwrap().len());

    let arr = ArrayFile::<Pair>::open(&path, false).unwrap();
    assert_eq!(10, arr.len());
    assert_eq!(10, arr.cap());
    for (i, w) in want.iter().enumerate() {
        let mut p = Pair::default();
        arr.get(i, &mut p).unwrap();
        assert_eq!(*w, p);
    }
    arr.close().unwrap();
}

#[test]
fn test_append_beyond_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overflow.bin");
    let mut arr = ArrayFile::<Pair>::create(&path, 0, 10).unwrap();
    for i in 0..11i64 {
        let p = Pair { high: i, low: -i };
        let res = arr.append(&[p]);
        if i < 10 {
            res.unwrap();
        } else {
            assert!(res.unwrap_err().is_capacity_exceeded());
        }
    }
    assert_eq!(10, arr.len());
    arr.close().unwrap();
}

#[test]
fn test_append_partial_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.bin");
    let mut arr = ArrayFile::<Limited>::create(&path, 0, 8).unwrap();
    let res = arr.append(&[Limited(0), Limited(1), Limited(2), Limited(3), Limited(1)]);
    assert!(matches!(res, Err(Error::Encode(_))));
    // records before the failing one are committed.
    assert_eq!(3, arr.len());
    assert_eq!(2, arr.read(2).unwrap().0);
    arr.close().unwrap();
    let data = fs::read(&path).unwrap();
    assert_eq!(32, data.len());
    assert!(data[12..].iter().all(|b| *b == 0));
}

#[test]
fn test_set_then_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("set.bin");
    let n = 100;
    let mut arr = ArrayFile::<Pair>::create(&path, n, n).unwrap();
    let mut want = vec![];
    for i in 0..n as i64 {
        let plus = i + 1;
        let p = Pair {
            high: plus * 123456,
            low: plus * 789,
        };
        arr.set(i as usize, &p).unwrap();
        want.push(p);
    }
    arr.close().unwrap();

    let arr = ArrayFile::<Pair>::open(&path, false).unwrap();
    let have: Vec<Pair> = arr.iter().collect::<Result<_>>().unwrap();
    assert_eq!(want, have);
    arr.close().unwrap();
}

#[test]
fn test_random_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("random.bin");
    let mut rng = rand::thread_rng();
    let want: Vec<Pair> = (0..1000)
        .map(|_| Pair {
            high: rng.gen(),
            low: rng.gen(),
        })
        .collect();
    let mut arr = ArrayFile::<Pair>::create(&path, 0, want.len()).unwrap();
    arr.append(&want).unwrap();
    arr.flush().unwrap();
    let snapshot = fs::read(&path).unwrap();
    // repeated flush leaves file unchanged
    arr.flush().unwrap();
    assert_eq!(snapshot, fs::read(&path).unwrap());
    arr.close().unwrap();

    let mut arr = ArrayFile::<Pair>::open(&path, true).unwrap();
    assert_eq!(want.len(), arr.len());
    for (i, w) in want.iter().enumerate() {
        assert_eq!(*w, arr.read(i).unwrap());
    }
    // full array opened writable cannot grow
    assert!(arr.push(&Pair::default()).unwrap_err().is_capacity_exceeded());
    arr.close().unwrap();
}

#[test]
fn test_out_of_bound_access_keeps_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bound.bin");
    let mut arr = ArrayFile::<Pair>::create(&path, 0, 4).unwrap();
    arr.push(&Pair { high: 1, low: 2 }).unwrap();
    let mut p = Pair { high: 9, low: 9 };
    assert!(arr.get(1, &mut p).unwrap_err().is_out_of_bound());
    assert_eq!(Pair { high: 9, low: 9 }, p);
    assert!(arr.set(4, &p).unwrap_err().is_out_of_bound());
    assert_eq!(1, arr.len());
    arr.close().unwrap();
    let data = fs::read(&path).unwrap();
    assert!(data[16..].iter().all(|b| *b == 0));
}

#[test]
fn test_open_uneven_file_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uneven.bin");
    let mut arr = ArrayFile::<Pair>::create(&path, 0, 3).unwrap();
    arr.append(&[
        Pair { high: 1, low: 1 },
        Pair { high: 2, low: 2 },
        Pair { high: 3, low: 3 },
    ])
    .unwrap();
    arr.close().unwrap();
    // trailing partial record
    let mut data = fs::read(&path).unwrap();
    data.extend_from_slice(&[0xff; 7]);
    fs::write(&path, &data).unwrap();

    let arr = ArrayFile::<Pair>::open(&path, false).unwrap();
    assert_eq!(3, arr.len());
    assert_eq!(3, arr.cap());
    assert_eq!(55, arr.size());
    assert_eq!(Pair { high: 3, low: 3 }, arr.read(2).unwrap());
    arr.close().unwrap();
    // opening never resizes the file
    assert_eq!(55, fs::metadata(&path).unwrap().len());
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.bin");
    let res = ArrayFile::<Pair>::open(&path, false);
    assert!(matches!(res, Err(Error::Open { .. })));
}

#[test]
fn test_typed_view_and_array_file_share_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.bin");
    let mut view = TypedView::<u64>::create(&path, 0, 5).unwrap();
    view.extend_from_slice(&[5, 4, 3, 2, 1]).unwrap();
    view.close().unwrap();
    if cfg!(target_endian = "little") {
        let arr = ArrayFile::<u64>::open(&path, false).unwrap();
        let vals: Vec<u64> = arr.iter().collect::<Result<_>>().unwrap();
        assert_eq!(vec![5, 4, 3, 2, 1], vals);
        arr.close().unwrap();
    }
}
