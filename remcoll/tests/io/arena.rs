//! Integration tests for BufferArena and BlockPool

use remcoll::io::{ArenaError, BlockPool, BufferArena};
use std::io::Write;
use std::sync::Arc;

#[test]
fn test_serde_writer_grows_arena() {
    let pool = Arc::new(BlockPool::<u8>::new());
    let mut arena = BufferArena::acquire(&pool, 1).unwrap();
    let value = serde_json::json!({"name": "a fairly long string that outgrows the first block"});

    serde_json::to_writer(&mut arena, &value).unwrap();

    let back: serde_json::Value = serde_json::from_slice(arena.written()).unwrap();
    assert_eq!(back, value);
    assert!(arena.capacity() >= arena.len());
    // Every growth gives the outgrown block back
    assert_eq!(pool.rented() - 1, pool.returned());
}

#[test]
fn test_std_write_and_embedded_write_agree() {
    let pool = BlockPool::shared();
    let mut std_arena = BufferArena::acquire(&pool, 8).unwrap();
    let mut embedded_arena = BufferArena::acquire(&pool, 8).unwrap();

    std_arena.write_all(b"pooled bytes").unwrap();
    embedded_io::Write::write_all(&mut embedded_arena, b"pooled bytes").unwrap();

    assert_eq!(std_arena.written(), embedded_arena.written());
}

#[test]
fn test_reset_then_reuse() {
    let pool = Arc::new(BlockPool::<u8>::new());
    let mut arena = BufferArena::acquire(&pool, 32).unwrap();
    arena.write_slice(b"first").unwrap();

    arena.reset().unwrap();
    assert!(arena.is_empty());
    assert_eq!(pool.idle(), 1);

    arena.write_slice(b"second").unwrap();
    assert_eq!(arena.written(), b"second");
    assert_eq!(pool.idle(), 0);
}

#[test]
fn test_drop_returns_block() {
    let pool = Arc::new(BlockPool::<u8>::new());
    {
        let mut arena = BufferArena::acquire(&pool, 16).unwrap();
        arena.write_slice(b"scoped").unwrap();
    }
    assert_eq!(pool.rented(), 1);
    assert_eq!(pool.returned(), 1);
    assert_eq!(pool.idle(), 1);
}

#[test]
fn test_owned_vec_leaves_pool() {
    let pool = Arc::new(BlockPool::<u8>::new());
    let mut arena = BufferArena::acquire(&pool, 16).unwrap();
    arena.write_slice(b"keep me").unwrap();

    let owned = arena.to_owned_vec().unwrap();
    drop(arena);

    assert_eq!(owned, b"keep me".to_vec());
    assert_eq!(pool.returned(), 0);
    assert_eq!(pool.idle(), 0);
}

#[test]
fn test_disposed_arena_rejects_writes() {
    let pool = Arc::new(BlockPool::<u8>::new());
    let mut arena = BufferArena::acquire(&pool, 16).unwrap();
    arena.dispose();
    arena.dispose();

    assert!(matches!(
        arena.write_slice(b"late"),
        Err(ArenaError::UseAfterDispose)
    ));
    assert!(matches!(arena.to_owned_vec(), Err(ArenaError::UseAfterDispose)));
    assert_eq!(pool.returned(), 1);
}

#[test]
fn test_pool_retention_limit() {
    let pool = Arc::new(BlockPool::<u8>::with_max_retained(1));
    let first = pool.rent(16);
    let second = pool.rent(16);

    pool.give_back(first);
    pool.give_back(second);

    assert_eq!(pool.returned(), 2);
    assert_eq!(pool.idle(), 1);
}
