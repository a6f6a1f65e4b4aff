//! Ordered iteration over overlay and index

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::btree_map;
use std::iter::Peekable;

use super::overlay::Pending;
use crate::index::IndexEntry;

/// Iterator over live `(key, value)` pairs in ascending key order.
///
/// Staged changes shadow committed documents; removed keys are skipped.
/// Borrows the database, so the handle cannot change while it is alive.
pub struct Iter<'a> {
    image: &'a [u8],
    overlay: Peekable<btree_map::Range<'a, Vec<u8>, Pending>>,
    index: Peekable<btree_map::Range<'a, Vec<u8>, IndexEntry>>,
}

impl<'a> Iter<'a> {
    pub(super) fn new(
        image: &'a [u8],
        overlay: btree_map::Range<'a, Vec<u8>, Pending>,
        index: btree_map::Range<'a, Vec<u8>, IndexEntry>,
    ) -> Self {
        Self {
            image,
            overlay: overlay.peekable(),
            index: index.peekable(),
        }
    }

    fn committed(&self, entry: &IndexEntry) -> Cow<'a, [u8]> {
        Cow::Borrowed(&self.image[entry.value_range()])
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], Cow<'a, [u8]>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let order = match (self.overlay.peek(), self.index.peek()) {
                (None, None) => return None,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some((staged, _)), Some((committed, _))) => staged.cmp(committed),
            };

            match order {
                Ordering::Greater => {
                    let (key, entry) = self.index.next()?;
                    return Some((key.as_slice(), self.committed(entry)));
                }
                Ordering::Less => {
                    let (key, pending) = self.overlay.next()?;
                    let value = match pending {
                        Pending::Value(bytes) => Cow::Borrowed(bytes.as_slice()),
                        Pending::Mutable(doc) => Cow::Owned(doc.encode()),
                        Pending::Removed => continue,
                    };
                    return Some((key.as_slice(), value));
                }
                Ordering::Equal => {
                    let (key, pending) = self.overlay.next()?;
                    let (_, entry) = self.index.next()?;
                    let value = match pending {
                        Pending::Removed => continue,
                        Pending::Value(bytes) => Cow::Borrowed(bytes.as_slice()),
                        Pending::Mutable(doc) if doc.is_changed() => Cow::Owned(doc.encode()),
                        Pending::Mutable(_) => self.committed(entry),
                    };
                    return Some((key.as_slice(), value));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, DbConfig, OpenMode, PutMode};
    use crate::storage::MemoryStore;

    fn keys(db: &Database) -> Vec<String> {
        db.iter()
            .map(|(k, _)| String::from_utf8(k.to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn test_merge_overlay_over_index() {
        let config = DbConfig {
            page_size: 512,
            ..DbConfig::default()
        };
        let mut db =
            Database::open_store(Box::new(MemoryStore::new()), OpenMode::CreateAndWrite, &config)
                .unwrap();
        for key in ["b", "d", "f"] {
            db.put(key.as_bytes(), b"committed", PutMode::Insert).unwrap();
        }
        db.commit_changes().unwrap();

        db.put(b"a", b"staged", PutMode::Insert).unwrap();
        db.put(b"d", b"updated", PutMode::Update).unwrap();
        db.remove(b"f").unwrap();
        db.put(b"g", b"staged", PutMode::Insert).unwrap();

        assert_eq!(keys(&db), vec!["a", "b", "d", "g"]);
        let d: Vec<_> = db.iter().filter(|(k, _)| *k == b"d").collect();
        assert_eq!(&*d[0].1, b"updated");
        assert_eq!(db.iter().count(), db.len());

        let tail: Vec<_> = db.iter_from(b"c").map(|(k, _)| k.to_vec()).collect();
        assert_eq!(tail, vec![b"d".to_vec(), b"g".to_vec()]);
    }
}
