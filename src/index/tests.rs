//! Integration tests for the index layer

#[cfg(test)]
mod tests {
    use crate::index::{HashIndexOptions, MultiValueIndex};
    use crate::record::RecordId;
    use crate::vector::VectorArena;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn setup(temp_dir: &TempDir, reset: bool) -> (VectorArena, MultiValueIndex) {
        let arena = VectorArena::open(temp_dir.path().join("vectors"), reset, true).unwrap();
        let index = MultiValueIndex::open(
            temp_dir.path().join("author"),
            reset,
            HashIndexOptions::default(),
        )
        .unwrap();
        (arena, index)
    }

    #[test]
    fn test_multi_value_basic() {
        let temp_dir = TempDir::new().unwrap();
        let (mut arena, mut index) = setup(&temp_dir, true);

        index.insert(&mut arena, "a", 1).unwrap();
        index.insert(&mut arena, "a", 2).unwrap();
        index.insert(&mut arena, "b", 3).unwrap();

        assert_eq!(index.find_all(&mut arena, "a").unwrap(), vec![1, 2]);
        assert_eq!(index.find_all(&mut arena, "b").unwrap(), vec![3]);
        assert!(index.find_all(&mut arena, "c").unwrap().is_empty());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_rewrite_and_removal() {
        let temp_dir = TempDir::new().unwrap();
        let (mut arena, mut index) = setup(&temp_dir, true);

        for id in 1..=20 {
            index.insert(&mut arena, "tag", id).unwrap();
        }
        index.rewrite(&mut arena, "tag", &[4, 8]).unwrap();
        assert_eq!(index.find_all(&mut arena, "tag").unwrap(), vec![4, 8]);

        // An empty set drops the key entirely
        index.rewrite(&mut arena, "tag", &[]).unwrap();
        assert!(index.find_all(&mut arena, "tag").unwrap().is_empty());
        assert!(index.is_empty());
        assert_eq!(arena.stats().unwrap().free_pages, arena.stats().unwrap().pages);
    }

    #[test]
    fn test_find_live_compacts_lazily() {
        let temp_dir = TempDir::new().unwrap();
        let (mut arena, mut index) = setup(&temp_dir, true);

        for id in [5, 3, 5, 9, 1] {
            index.insert(&mut arena, "title", id).unwrap();
        }
        let deleted: HashSet<RecordId> = [9].into_iter().collect();

        let live = index
            .find_live(&mut arena, "title", |id| !deleted.contains(&id))
            .unwrap();
        assert_eq!(live, vec![1, 3, 5]);
        assert_eq!(index.find_all(&mut arena, "title").unwrap(), vec![1, 3, 5]);

        // Nothing stale left: no rewrite happens and the order is kept
        index.insert(&mut arena, "title", 2).unwrap();
        let live = index.find_live(&mut arena, "title", |_| true).unwrap();
        assert_eq!(live, vec![1, 2, 3, 5]);
        assert_eq!(index.find_all(&mut arena, "title").unwrap(), vec![1, 3, 5, 2]);

        // Everything stale: the key disappears
        let live = index.find_live(&mut arena, "title", |_| false).unwrap();
        assert!(live.is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_shared_arena_many_keys() {
        let temp_dir = TempDir::new().unwrap();
        let mut arena = VectorArena::open(temp_dir.path().join("vectors"), true, true).unwrap();
        let options = HashIndexOptions::default();
        let mut by_author = MultiValueIndex::open(temp_dir.path().join("author"), true, options).unwrap();
        let mut by_keyword = MultiValueIndex::open(temp_dir.path().join("keyword"), true, options).unwrap();

        for id in 1..=3000u32 {
            by_author
                .insert(&mut arena, format!("author-{}", id % 97), id)
                .unwrap();
            by_keyword
                .insert(&mut arena, format!("kw-{}", id % 5), id)
                .unwrap();
        }

        assert_eq!(by_author.len(), 97);
        assert_eq!(by_keyword.len(), 5);

        let expected: Vec<RecordId> = (1..=3000).filter(|id| id % 97 == 13).collect();
        assert_eq!(by_author.find_all(&mut arena, "author-13").unwrap(), expected);

        // 600 ids per keyword: these vectors are large by now
        let expected: Vec<RecordId> = (1..=3000).filter(|id| id % 5 == 2).collect();
        assert_eq!(by_keyword.find_all(&mut arena, "kw-2").unwrap(), expected);
        assert!(arena.stats().unwrap().large_vectors >= 5);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let (mut arena, mut index) = setup(&temp_dir, true);
            for id in 1..=50 {
                index.insert(&mut arena, format!("key-{}", id % 7), id).unwrap();
            }
            index.flush().unwrap();
            arena.flush().unwrap();
        }

        let (mut arena, mut index) = setup(&temp_dir, false);
        assert_eq!(index.len(), 7);
        let expected: Vec<RecordId> = (1..=50).filter(|id| id % 7 == 3).collect();
        assert_eq!(index.find_all(&mut arena, "key-3").unwrap(), expected);

        index.insert(&mut arena, "key-3", 51).unwrap();
        assert_eq!(index.find_all(&mut arena, "key-3").unwrap().last(), Some(&51));
    }
}
