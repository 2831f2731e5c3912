use std::ptr::NonNull;

use cordyceps::Linked;
use cordyceps_avl::{paths::equal_paths, AvlMap, AvlTree, Links, TreeNode};

#[derive(Debug)]
#[repr(C)]
struct Node {
    links: Links<Node>,
    key: u32,
}

impl Node {
    fn new(key: u32) -> Box<Node> {
        Box::new(Node {
            links: Links::new(),
            key,
        })
    }
}

unsafe impl Linked<Links<Node>> for Node {
    type Handle = Box<Node>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::from(Box::leak(r))
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<Node>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<Node>> for Node {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

fn print_keys(tree: &AvlTree<Node>) {
    let keys = tree.iter().map(|node| node.key).collect::<Vec<_>>();
    let even = equal_paths(tree.root());
    println!("{keys:?} (leaves at equal depth: {even})");
}

fn main() {
    let mut tree: AvlTree<Node> = AvlTree::new();

    for key in [2, 0, 3, 4, 5, 1, 6] {
        tree.insert(Node::new(key));
        tree.assert_invariants();
        print_keys(&tree);
    }

    for key in [0, 4] {
        let removed = tree.remove(&key).map(|node| node.key);
        assert_eq!(removed, Some(key));
        tree.assert_invariants();
        print_keys(&tree);
    }

    let mut dot = String::new();
    if tree.dotgraph("demo", &mut dot).is_ok() {
        println!("{dot}");
    }

    let mut map: AvlMap<&str, usize> = "the quick brown fox jumps over the lazy dog"
        .split(' ')
        .map(|word| (word, word.len()))
        .collect();
    map.assert_invariants();

    println!("{map:?}");
    println!("after \"fox\": {:?}", map.successor(&"fox"));
    println!("before \"fox\": {:?}", map.predecessor(&"fox"));
    match map.try_get(&"cat") {
        Ok(len) => println!("\"cat\": {len}"),
        Err(err) => println!("\"cat\": {err}"),
    }

    map.remove(&"the");
    map.assert_invariants();
    println!("{map:?}");
}
