extern crate std;

use std::{ops::Range, prelude::v1::*};

use proptest::prelude::*;

use crate::model::{self, TestNode};
use crate::paths::equal_paths;

use super::*;

fn keys(tree: &AvlTree<TestNode>) -> Vec<u32> {
    tree.iter().map(|node| node.key).collect()
}

// Returns (key, balance) of the root and its two children.
fn top(tree: &AvlTree<TestNode>) -> [(u32, i8); 3] {
    let root = tree.root().expect("tree is empty");
    let left = root.left().expect("root has no left child");
    let right = root.right().expect("root has no right child");

    [
        (*root.key(), root.balance()),
        (*left.key(), left.balance()),
        (*right.key(), right.balance()),
    ]
}

// Returns (key, balance, parent key) of every node in key order.
fn shape(tree: &AvlTree<TestNode>) -> Vec<(u32, i8, Option<u32>)> {
    let mut out = Vec::new();
    let mut curs = tree.cursor_first();

    while let Some(node) = curs.node() {
        out.push((*node.key(), node.balance(), node.parent().map(|p| *p.key())));
        curs.move_next();
    }

    out
}

fn tree_of(keys: impl IntoIterator<Item = u32>) -> AvlTree<TestNode> {
    let mut tree = AvlTree::new();
    for key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }
    tree
}

fn insert_find_all(keys: &[u32]) {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

#[test]
fn four_elems_find() {
    insert_find_all(&[0, 1, 2, 3]);
    insert_find_all(&[0, 1, 3, 2]);
    insert_find_all(&[0, 2, 1, 3]);
    insert_find_all(&[0, 2, 3, 1]);
    insert_find_all(&[0, 3, 1, 2]);
    insert_find_all(&[0, 3, 2, 1]);

    insert_find_all(&[1, 0, 2, 3]);
    insert_find_all(&[1, 0, 3, 2]);
    insert_find_all(&[1, 2, 0, 3]);
    insert_find_all(&[1, 2, 3, 0]);
    insert_find_all(&[1, 3, 0, 2]);
    insert_find_all(&[1, 3, 2, 0]);

    insert_find_all(&[2, 0, 1, 3]);
    insert_find_all(&[2, 0, 3, 1]);
    insert_find_all(&[2, 1, 0, 3]);
    insert_find_all(&[2, 1, 3, 0]);
    insert_find_all(&[2, 3, 0, 1]);
    insert_find_all(&[2, 3, 1, 0]);

    insert_find_all(&[3, 0, 1, 2]);
    insert_find_all(&[3, 0, 2, 1]);
    insert_find_all(&[3, 1, 0, 2]);
    insert_find_all(&[3, 1, 2, 0]);
    insert_find_all(&[3, 2, 0, 1]);
    insert_find_all(&[3, 2, 1, 0]);
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys {
        let node = tree.remove(key).expect("item not found");
        assert_eq!(node.key, *key);
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
    assert!(tree.root().is_none());

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        let node = tree.get_raw(key).expect("item not found");
        unsafe { tree.remove_at(node) };
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
    assert!(tree.root().is_none());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    insert_remove_all(&[0, 1, 2]);
    insert_remove_all(&[0, 2, 1]);
    insert_remove_all(&[1, 0, 2]);
    insert_remove_all(&[1, 2, 0]);
    insert_remove_all(&[2, 0, 1]);
    insert_remove_all(&[2, 1, 0]);
}

// Every permutation of `0..n`, in lexicographic order.
fn permutations(n: u32) -> Vec<Vec<u32>> {
    fn extend(prefix: &mut Vec<u32>, n: u32, out: &mut Vec<Vec<u32>>) {
        if prefix.len() == n as usize {
            out.push(prefix.clone());
            return;
        }

        for key in 0..n {
            if !prefix.contains(&key) {
                prefix.push(key);
                extend(prefix, n, out);
                prefix.pop();
            }
        }
    }

    let mut out = Vec::new();
    extend(&mut Vec::new(), n, &mut out);
    out
}

#[test]
fn remove_four() {
    for keys in permutations(4) {
        insert_remove_all(&keys);
    }
}

#[test]
fn remove_five() {
    for keys in permutations(5) {
        insert_remove_all(&keys);
    }
}

#[test]
fn right_right_insert_rotates_left() {
    let tree = tree_of([1, 2, 3]);

    assert_eq!(top(&tree), [(2, 0), (1, 0), (3, 0)]);
}

#[test]
fn left_left_insert_rotates_right() {
    let tree = tree_of([3, 2, 1]);

    assert_eq!(top(&tree), [(2, 0), (1, 0), (3, 0)]);
}

#[test]
fn left_right_insert_rotates_twice() {
    let tree = tree_of([3, 1, 2]);

    assert_eq!(top(&tree), [(2, 0), (1, 0), (3, 0)]);
}

#[test]
fn right_left_insert_rotates_twice() {
    let tree = tree_of([1, 3, 2]);

    assert_eq!(top(&tree), [(2, 0), (1, 0), (3, 0)]);
}

#[test]
fn duplicate_insert_replaces_item() {
    let mut tree = tree_of(1..=7);
    let before = shape(&tree);

    let old = tree
        .insert(TestNode::with_value(4, 1))
        .expect("key 4 was already present");
    assert_eq!((old.key, old.value), (4, 0));

    let old = tree
        .insert(TestNode::with_value(4, 2))
        .expect("key 4 was already present");
    assert_eq!((old.key, old.value), (4, 1));
    tree.assert_invariants();

    assert_eq!(tree.len(), 7);
    assert_eq!(tree.get(&4).map(|node| node.value), Some(2));
    assert_eq!(top(&tree), [(4, 0), (2, 0), (6, 0)]);
    assert_eq!(shape(&tree), before);
}

#[test]
fn remove_from_seven_keeps_order() {
    let mut tree = tree_of(1..=7);

    let removed = tree.remove(&1).expect("1 is present");
    assert_eq!(removed.key, 1);
    tree.assert_invariants();

    assert_eq!(keys(&tree), [2, 3, 4, 5, 6, 7]);
    assert_eq!(tree.len(), 6);
}

#[test]
fn remove_absent_key_is_noop() {
    let mut tree = tree_of([5, 3, 8]);

    assert!(tree.remove(&4).is_none());
    assert!(tree.remove(&100).is_none());
    assert_eq!(keys(&tree), [3, 5, 8]);
    tree.assert_invariants();

    let mut empty: AvlTree<TestNode> = AvlTree::new();
    assert!(empty.remove(&0).is_none());
    assert!(empty.is_empty());
}

#[test]
fn remove_with_two_children_takes_predecessor_position() {
    let mut tree = tree_of(1..=7);

    // 4 is the root; its predecessor 3 takes its place.
    tree.remove(&4).expect("4 is present");
    tree.assert_invariants();

    let root = tree.root().unwrap();
    assert_eq!(*root.key(), 3);
    assert_eq!(*root.left().unwrap().key(), 2);
    assert_eq!(*root.right().unwrap().key(), 6);
    assert_eq!(keys(&tree), [1, 2, 3, 5, 6, 7]);
}

#[test]
fn removal_rotation_with_residual_lean() {
    // 2 has a right subtree of height 2 whose root is 0-balanced, so removing 1 rotates at 2 and
    // leaves the new subtree root leaning.
    let mut tree = tree_of([2, 1, 4, 3, 5]);

    tree.remove(&1).expect("1 is present");
    tree.assert_invariants();

    let root = tree.root().unwrap();
    assert_eq!((*root.key(), root.balance()), (4, 1));
    let left = root.left().unwrap();
    assert_eq!((*left.key(), left.balance()), (2, -1));
    assert_eq!(*left.right().unwrap().key(), 3);
}

// Builds the complete tree over 1..=15 (root 8) and removes keys at every depth, checking that
// balances propagate correctly through multiple levels of rotations.
#[test]
fn cascading_removals_on_complete_tree() {
    let order = [8, 4, 12, 2, 6, 10, 14, 1, 3, 5, 7, 9, 11, 13, 15];

    let removal_orders: [&[u32]; 5] = [
        &[1, 3, 2, 5, 7, 6, 4],
        &[15, 13, 14, 9, 11, 10, 12, 8],
        &[8, 4, 12, 2, 6, 10, 14],
        &[1, 3, 5, 7, 2, 9, 11, 13, 15, 6],
        &[7, 6, 5, 4, 3, 2, 1, 15, 14, 13, 12, 11, 10, 9, 8],
    ];

    for removals in removal_orders {
        let mut tree = tree_of(order);
        assert!(equal_paths(tree.root()));
        assert_eq!(top(&tree), [(8, 0), (4, 0), (12, 0)]);

        let mut expected: Vec<u32> = (1..=15).collect();

        for key in removals {
            tree.remove(key).expect("key is present");
            tree.assert_invariants();

            expected.retain(|k| k != key);
            assert_eq!(keys(&tree), expected);
        }
    }
}

#[test]
fn removal_cascade_rotates_at_root() {
    // Left subtree of height 2, right subtree of height 3. Removing 1 shrinks the left side and
    // forces a rotation at the root.
    let mut tree = tree_of([5, 2, 8, 1, 7, 10, 9]);
    let root = tree.root().unwrap();
    assert_eq!((*root.key(), root.balance()), (5, -1));

    tree.remove(&1).expect("1 is present");
    tree.assert_invariants();

    let root = tree.root().unwrap();
    assert_eq!(*root.key(), 8);
    assert_eq!(root.parent().map(|p| *p.key()), None);
    assert_eq!(keys(&tree), [2, 5, 7, 8, 9, 10]);
}

#[test]
fn round_trip_large() {
    let n = 500u32;
    let mut tree = AvlTree::new();

    // A fixed permutation of 0..n.
    for i in 0..n {
        tree.insert(TestNode::new((i * 211) % n));
    }
    tree.assert_invariants();
    assert_eq!(tree.len(), n as usize);
    assert_eq!(keys(&tree), (0..n).collect::<Vec<_>>());

    for i in 0..n {
        let key = (i * 17 + 3) % n;
        assert_eq!(tree.remove(&key).map(|node| node.key), Some(key));
        if i % 50 == 0 {
            tree.assert_invariants();
        }
    }

    assert!(tree.is_empty());
    assert!(tree.root().is_none());
}

#[test]
fn rotate_without_pivot_is_noop() {
    let mut tree = tree_of([2, 1]);
    let root = tree.root.unwrap();

    // 2 has no right child to rotate left around.
    let same = tree.rotate(root, Dir::Left);
    assert_eq!(same, root);
    tree.assert_invariants();
    assert_eq!(top_key(&tree), 2);

    let new_root = tree.rotate(root, Dir::Right);
    assert_eq!(unsafe { new_root.as_ref().key }, 1);
    assert_eq!(top_key(&tree), 1);
    assert_eq!(unsafe { tree.links(new_root).balance() }, -1);
    assert_eq!(unsafe { tree.links(root).balance() }, 0);
}

fn top_key(tree: &AvlTree<TestNode>) -> u32 {
    *tree.root().unwrap().key()
}

#[test]
fn node_swap_exchanges_positions_and_balances() {
    let mut tree = tree_of([4, 2, 6, 1, 3, 5, 7, 0]);
    let four = tree.get_raw(&4).unwrap();
    let three = tree.get_raw(&3).unwrap();

    let four_balance = unsafe { tree.links(four).balance() };
    let three_balance = unsafe { tree.links(three).balance() };

    unsafe { tree.node_swap(four, three) };

    assert_eq!(tree.root, Some(three));
    unsafe {
        assert_eq!(tree.links(three).balance(), four_balance);
        assert_eq!(tree.links(four).balance(), three_balance);
        assert_eq!(tree.links(four).parent(), tree.get_raw(&2));
        assert!(tree.links(four).is_leaf());
    }

    // Swap back, then swap a parent with its own child.
    unsafe { tree.node_swap(four, three) };
    tree.assert_invariants();

    let two = tree.get_raw(&2).unwrap();
    let one = tree.get_raw(&1).unwrap();
    unsafe {
        tree.swap_positions(two, one);
        assert_eq!(tree.links(one).left(), Some(two));
        assert_eq!(tree.links(two).parent(), Some(one));
        tree.swap_positions(one, two);
    }
    tree.assert_invariants();
}

#[test]
fn neighbors_walk_in_order() {
    let tree = tree_of([50, 20, 80, 10, 30, 70, 90, 60]);

    let mut forward = Vec::new();
    let mut node = tree.root().map(|root| {
        let mut first = root;
        while let Some(left) = first.left() {
            first = left;
        }
        first
    });
    while let Some(n) = node {
        forward.push(*n.key());
        node = n.successor();
    }
    assert_eq!(forward, [10, 20, 30, 50, 60, 70, 80, 90]);

    let sixty = tree.cursor_at(&60).node().unwrap();
    assert_eq!(sixty.predecessor().map(|n| *n.key()), Some(50));
    assert_eq!(sixty.successor().map(|n| *n.key()), Some(70));
    assert_eq!(sixty.parent().map(|n| *n.key()), Some(70));

    let ten = tree.cursor_first().node().unwrap();
    assert!(ten.predecessor().is_none());
    assert!(ten.is_leaf());
}

#[test]
fn iter_both_ends() {
    let tree = tree_of([4, 2, 6, 1, 3, 5, 7]);
    let mut iter = tree.iter();

    assert_eq!(iter.len(), 7);
    assert_eq!(iter.next().map(|n| n.key), Some(1));
    assert_eq!(iter.next_back().map(|n| n.key), Some(7));
    assert_eq!(iter.next_back().map(|n| n.key), Some(6));
    assert_eq!(iter.len(), 4);

    let middle: Vec<_> = iter.map(|n| n.key).collect();
    assert_eq!(middle, [2, 3, 4, 5]);

    let all: Vec<_> = (&tree).into_iter().rev().map(|n| n.key).collect();
    assert_eq!(all, [7, 6, 5, 4, 3, 2, 1]);
}

#[test]
fn cursor_removes_and_wraps() {
    let mut tree = tree_of(0..6);

    {
        let mut curs = tree.cursor_at_mut(&2);
        assert_eq!(curs.get().map(|n| n.key), Some(2));

        let removed = curs.remove_current().unwrap();
        assert_eq!(removed.key, 2);
        assert_eq!(curs.get().map(|n| n.key), Some(3));

        let removed = curs.remove_current_and_move_prev().unwrap();
        assert_eq!(removed.key, 3);
        assert_eq!(curs.get().map(|n| n.key), Some(1));
        assert_eq!(curs.as_cursor().peek_next().map(|n| n.key), Some(4));
    }
    tree.assert_invariants();

    let mut curs = tree.cursor_last();
    assert_eq!(curs.get().map(|n| n.key), Some(5));
    curs.move_next();
    assert!(curs.get().is_none());
    assert_eq!(curs.peek_next().map(|n| n.key), Some(0));
    curs.move_next();
    assert_eq!(curs.get().map(|n| n.key), Some(0));
}

#[test]
fn first_last_and_pop() {
    let mut tree = tree_of([3, 1, 4, 5, 9, 2, 6]);

    assert_eq!(tree.first().map(|n| n.key), Some(1));
    assert_eq!(tree.last().map(|n| n.key), Some(9));

    assert_eq!(tree.pop_first().map(|n| n.key), Some(1));
    assert_eq!(tree.pop_last().map(|n| n.key), Some(9));
    tree.assert_invariants();
    assert_eq!(keys(&tree), [2, 3, 4, 5, 6]);

    tree.clear();
    assert!(tree.is_empty());
    assert!(tree.first().is_none());
    assert!(tree.pop_last().is_none());
}

#[test]
fn ascending_inserts_stay_complete() {
    // Ascending runs of 2^k - 1 keys produce perfect trees.
    for k in 1..=6u32 {
        let tree = tree_of(1..(1 << k));
        assert!(equal_paths(tree.root()), "2^{k} - 1 keys");
    }

    let tree = tree_of(1..=4);
    assert!(!equal_paths(tree.root()));
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn cursor_equivalence(
        values in proptest::collection::vec(0u32..500, 0..100),
        ops in proptest::collection::vec(model::cursor_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_cursor_equivalence(values, ops);
    }

    #[test]
    fn any_order_round_trip(keys in Just((0u32..64).collect::<Vec<_>>()).prop_shuffle(),
                            removals in Just((0u32..64).collect::<Vec<_>>()).prop_shuffle()) {
        let mut tree = tree_of(keys);
        for key in removals {
            prop_assert!(tree.remove(&key).is_some());
            tree.assert_invariants();
        }
        prop_assert!(tree.root().is_none());
    }
}
