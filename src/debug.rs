use alloc::{collections::VecDeque, string::String};
use core::{fmt, ptr::NonNull};

use crate::{AvlTree, Links, TreeNode};

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: fmt::Display,
{
    /// Writes a Graphviz rendering of the tree to `w`.
    ///
    /// Nodes are laid out level by level and labelled `key:balance`. Missing children are drawn
    /// as points so that left and right stay distinguishable.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let Some(root) = self.root else {
            return write!(w, "digraph \"graph-{name}\" {{}}");
        };

        enum Item<T: ?Sized> {
            Node(NonNull<T>),
            Missing(u32),
        }

        let mut level = VecDeque::new();
        level.push_back(Item::Node(root));

        writeln!(w, "digraph \"graph-{name}\" {{")?;
        writeln!(w, " subgraph \"subgraph-{name}\" {{")?;

        let mut missing = 0;
        let mut edges = String::new();

        while !level.is_empty() {
            use fmt::Write;

            w.write_str("{rank=same; ")?;

            for _ in 0..level.len() {
                let node = match level.pop_front() {
                    Some(Item::Node(node)) => node,
                    Some(Item::Missing(id)) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                    None => break,
                };

                let key = unsafe { node.as_ref().key() };
                let links = unsafe { self.links(node) };
                write!(w, "\"graph{name}-{key}\" [label=\"{key}:{}\"]; ", links.balance())?;

                for child in [links.left(), links.right()] {
                    match child {
                        Some(child) => {
                            let child_key = unsafe { child.as_ref().key() };
                            writeln!(
                                edges,
                                "\"graph{name}-{key}\" -> \"graph{name}-{child_key}\";"
                            )?;
                            level.push_back(Item::Node(child));
                        }
                        None => {
                            writeln!(
                                edges,
                                "\"graph{name}-{key}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            level.push_back(Item::Missing(missing));
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&edges)?;

        w.write_str(" }\n}")
    }
}
