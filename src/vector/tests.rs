use super::*;
use crate::file::INTS_PER_PAGE;
use std::path::PathBuf;
use tempfile::TempDir;

fn setup_test_arena(cache_info: bool) -> (TempDir, PathBuf, VectorArena) {
    let temp_dir = tempfile::tempdir().unwrap();
    let prefix = temp_dir.path().join("vectors");
    let arena = VectorArena::open(&prefix, true, cache_info).unwrap();
    (temp_dir, prefix, arena)
}

fn page_of(pos: VectorPos) -> u32 {
    pos / INTS_PER_PAGE as u32
}

#[test]
fn test_push_back_within_capacity_keeps_position() {
    let (_temp_dir, _prefix, mut arena) = setup_test_arena(true);

    // A capacity-2 vector holding one element, with a neighbour on its page
    let pos = arena.rewrite(EMPTY_VECTOR, &[9, 9]).unwrap();
    let neighbour = arena.rewrite(EMPTY_VECTOR, &[7, 7]).unwrap();
    let pos = arena.rewrite(pos, &[1]).unwrap();
    assert_eq!(arena.capacity(pos).unwrap(), 2);

    let same = arena.push_back(pos, 2).unwrap();
    assert_eq!(same, pos);
    assert_eq!(arena.get_data(pos).unwrap(), vec![1, 2]);

    let moved = arena.push_back(pos, 3).unwrap();
    assert_ne!(moved, pos);
    assert_eq!(arena.capacity(moved).unwrap(), 4);
    assert_eq!(arena.get_data(moved).unwrap(), vec![1, 2, 3]);
    assert_eq!(arena.get_data(neighbour).unwrap(), vec![7, 7]);
}

#[test]
fn test_push_back_from_empty() {
    let (_temp_dir, _prefix, mut arena) = setup_test_arena(false);

    let mut pos = EMPTY_VECTOR;
    for value in 1..=5 {
        pos = arena.push_back(pos, value).unwrap();
    }
    assert_eq!(arena.get_data(pos).unwrap(), vec![1, 2, 3, 4, 5]);
    assert_eq!(arena.capacity(pos).unwrap(), 8);
}

#[test]
fn test_freed_cells_reused_before_new_pages() {
    let (_temp_dir, _prefix, mut arena) = setup_test_arena(true);

    let mut positions = Vec::new();
    for i in 0..256 {
        let data: Vec<i32> = (1..=8).map(|v| v + i * 8).collect();
        positions.push(arena.rewrite(EMPTY_VECTOR, &data).unwrap());
    }
    let pages = arena.stats().unwrap().pages;
    assert_eq!(pages, 2);

    for pos in positions.iter().step_by(2) {
        assert_eq!(arena.del(*pos).unwrap(), EMPTY_VECTOR);
    }

    let mut fresh = Vec::new();
    for i in 0..128 {
        let data: Vec<i32> = (1..=8).map(|v| -(v + i * 8)).collect();
        fresh.push((arena.rewrite(EMPTY_VECTOR, &data).unwrap(), data));
    }

    let stats = arena.stats().unwrap();
    assert_eq!(stats.pages, pages);
    assert_eq!(stats.small_pages[3], 2);

    // Survivors are untouched, new vectors read back intact
    for (i, pos) in positions.iter().enumerate().skip(1).step_by(2) {
        let expected: Vec<i32> = (1..=8).map(|v| v + i as i32 * 8).collect();
        assert_eq!(arena.get_data(*pos).unwrap(), expected);
    }
    for (pos, data) in &fresh {
        assert_eq!(&arena.get_data(*pos).unwrap(), data);
    }
}

#[test]
fn test_alloc_free_alloc_reuses_page() {
    let (_temp_dir, _prefix, mut arena) = setup_test_arena(true);

    let first = arena.rewrite(EMPTY_VECTOR, &[5, 5, 5, 5]).unwrap();
    arena.del(first).unwrap();
    let stats = arena.stats().unwrap();
    assert_eq!(stats.free_pages, 1);

    let second = arena.rewrite(EMPTY_VECTOR, &[6, 6, 6, 6]).unwrap();
    assert_eq!(page_of(second), page_of(first));
    assert_eq!(arena.stats().unwrap().pages, 1);
    assert_eq!(arena.get_data(second).unwrap(), vec![6, 6, 6, 6]);
}

#[test]
fn test_empty_rewrite_deletes() {
    let (_temp_dir, _prefix, mut arena) = setup_test_arena(true);

    let pos = arena.rewrite(EMPTY_VECTOR, &[1, 2, 3]).unwrap();
    assert_eq!(arena.rewrite(pos, &[]).unwrap(), EMPTY_VECTOR);
    assert_eq!(arena.get_data(EMPTY_VECTOR).unwrap(), Vec::<i32>::new());
    assert_eq!(arena.del(EMPTY_VECTOR).unwrap(), EMPTY_VECTOR);
    assert_eq!(arena.stats().unwrap().free_pages, 1);
}

#[test]
fn test_rewrite_round_trip_small_and_large() {
    let (_temp_dir, _prefix, mut arena) = setup_test_arena(false);

    let mut pos = EMPTY_VECTOR;
    for len in [1usize, 3, 17, 512, 1024, 1025, 3000, 40, 2048] {
        let data: Vec<i32> = (1..=len as i32).map(|v| v * 7 - 3 * (v % 2) + 1).collect();
        pos = arena.rewrite(pos, &data).unwrap();
        assert_eq!(arena.get_data(pos).unwrap(), data, "length {}", len);
    }
}

#[test]
fn test_promotion_to_large_vector() {
    let (_temp_dir, _prefix, mut arena) = setup_test_arena(true);

    let mut pos = EMPTY_VECTOR;
    let mut large_pos = None;
    for value in 1..=1500 {
        pos = arena.push_back(pos, value).unwrap();
        if arena.capacity(pos).unwrap() as usize >= INTS_PER_PAGE {
            // Once large, the position never changes again
            assert_eq!(*large_pos.get_or_insert(pos), pos);
        }
    }

    assert_eq!(arena.capacity(pos).unwrap(), 2048);
    assert_eq!(arena.get_data(pos).unwrap(), (1..=1500).collect::<Vec<i32>>());

    let stats = arena.stats().unwrap();
    assert_eq!(stats.large_vectors, 1);
    assert_eq!(stats.large_pages, 2);
}

#[test]
fn test_large_vector_shrinks_in_place() {
    let (_temp_dir, _prefix, mut arena) = setup_test_arena(true);

    let data: Vec<i32> = (1..=3000).collect();
    let pos = arena.rewrite(EMPTY_VECTOR, &data).unwrap();
    assert_eq!(arena.capacity(pos).unwrap(), 3072);
    assert_eq!(arena.stats().unwrap().large_pages, 3);

    let same = arena.rewrite(pos, &[4, 5, 6]).unwrap();
    assert_eq!(same, pos);
    assert_eq!(arena.capacity(pos).unwrap(), 1024);
    assert_eq!(arena.get_data(pos).unwrap(), vec![4, 5, 6]);

    let stats = arena.stats().unwrap();
    assert_eq!(stats.large_pages, 1);
    assert_eq!(stats.free_pages, 2);

    // Growing again reuses the discarded pages
    let pos = arena.rewrite(pos, &data).unwrap();
    assert_eq!(arena.get_data(pos).unwrap(), data);
    assert_eq!(arena.stats().unwrap().pages, 3);

    assert_eq!(arena.del(pos).unwrap(), EMPTY_VECTOR);
    assert_eq!(arena.stats().unwrap().free_pages, 3);
}

#[test]
fn test_push_back_fills_large_tail() {
    let (_temp_dir, _prefix, mut arena) = setup_test_arena(false);

    let mut data: Vec<i32> = (1..=1024).collect();
    let pos = arena.rewrite(EMPTY_VECTOR, &data).unwrap();
    for value in 1025..=1030 {
        assert_eq!(arena.push_back(pos, value).unwrap(), pos);
        data.push(value);
    }

    assert_eq!(arena.capacity(pos).unwrap(), 2048);
    assert_eq!(arena.get_data(pos).unwrap(), data);
}

#[test]
fn test_recycled_pages_come_back_zeroed() {
    let (_temp_dir, _prefix, mut arena) = setup_test_arena(true);

    // Leave garbage behind in two freed pages
    let junk: Vec<i32> = (1..=2048).collect();
    let pos = arena.rewrite(EMPTY_VECTOR, &junk).unwrap();
    arena.del(pos).unwrap();

    let pos = arena.rewrite(EMPTY_VECTOR, &[1; 1024]).unwrap();
    let pos = arena.push_back(pos, 2).unwrap();
    let mut expected = vec![1; 1024];
    expected.push(2);
    assert_eq!(arena.get_data(pos).unwrap(), expected);
}

#[test]
fn test_persistence_across_reopen() {
    let (_temp_dir, prefix, mut arena) = setup_test_arena(true);

    let small = arena.rewrite(EMPTY_VECTOR, &[1, 2, 3, 4]).unwrap();
    let other = arena.rewrite(EMPTY_VECTOR, &[5, 6, 7, 8]).unwrap();
    let large: Vec<i32> = (1..=1500).collect();
    let large_pos = arena.rewrite(EMPTY_VECTOR, &large).unwrap();
    arena.del(small).unwrap();
    drop(arena);

    let mut arena = VectorArena::open(&prefix, false, false).unwrap();
    assert_eq!(arena.get_data(other).unwrap(), vec![5, 6, 7, 8]);
    assert_eq!(arena.get_data(large_pos).unwrap(), large);

    // The partly used capacity-4 page is found again instead of a new one
    let pages = arena.stats().unwrap().pages;
    let pos = arena.rewrite(EMPTY_VECTOR, &[9, 9, 9]).unwrap();
    assert_eq!(page_of(pos), page_of(other));
    assert_eq!(arena.stats().unwrap().pages, pages);
}

#[test]
fn test_reset_discards_vectors() {
    let (_temp_dir, prefix, mut arena) = setup_test_arena(true);
    arena.rewrite(EMPTY_VECTOR, &[1, 2]).unwrap();
    drop(arena);

    let mut arena = VectorArena::open(&prefix, true, true).unwrap();
    assert_eq!(arena.stats().unwrap(), ArenaStats::default());
}

// Zero is padding, never an element: storing it is a caller bug, checked in debug builds only
#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "0 is reserved as padding")]
fn test_zero_element_is_out_of_contract() {
    let (_temp_dir, _prefix, mut arena) = setup_test_arena(true);
    let _ = arena.push_back(EMPTY_VECTOR, 0);
}
