//! Inheritance cycle detection
//!
//! Tarjan's strongly connected components over the graph `class -> superclass`.
//! A component of more than one class is a cycle. It is reported once and cut
//! by rebinding its entry class to the root class, so every later walk up a
//! superclass chain terminates. The entry class is the first class of the
//! cycle, in the order the search reached it, that the current run tracks.

use rk_it::{ClassId, Program, SemanticError};
use rk_lower::LoweringContext;
use rustc_hash::FxHashMap;
use std::iter;
use tracing::trace;

/// Classes whose superclass chains are validated together
#[derive(Debug, Clone, Default)]
pub struct InheritanceValidator {
    classes: Vec<ClassId>,
}

impl InheritanceValidator {
    /// Validator tracking nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Include `class` in the next validation
    pub fn track(&mut self, class: ClassId) {
        self.classes.push(class);
    }

    /// Number of tracked classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class is tracked
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Report and break every cycle entered through a tracked class
    ///
    /// Chains may run into classes of other units; a cycle is only reported
    /// here when one of its classes is ours (marked `checking` for the
    /// duration of the call). Breaking it removes the cycle, so a later run
    /// never sees it again. Returns the number of cycles broken.
    pub fn validate(&self, ctx: &mut LoweringContext<'_>) -> usize {
        for &class in &self.classes {
            ctx.program.classes[class].checking = true;
        }

        let cycles = {
            let mut search = Tarjan::new(ctx.program);
            for &class in &self.classes {
                if !search.nodes.contains_key(&class) {
                    search.strong_connect(class);
                }
            }
            search.cycles
        };

        let mut broken = 0;
        for mut cycle in cycles {
            let Some(entry) = cycle.iter().position(|&class| ctx.program.classes[class].checking) else {
                continue;
            };
            cycle.rotate_left(entry);
            let Some(&first) = cycle.first() else {
                continue;
            };
            let description = describe_cycle(ctx.program, &cycle);
            let location = ctx.program.classes[first].location;
            ctx.error(location, SemanticError::CircularInheritance { cycle: description });
            let root = ctx.program.root_ty();
            ctx.program.classes[first].superclass = Some(root);
            trace!(class = %ctx.program.class_name(first), size = cycle.len(), "inheritance cycle broken");
            broken += 1;
        }

        for &class in &self.classes {
            ctx.program.classes[class].checking = false;
        }
        broken
    }
}

/// `A -> B -> A`, starting at the first class of the cycle
fn describe_cycle(program: &Program, cycle: &[ClassId]) -> String {
    let mut names: Vec<String> = cycle.iter().map(|&class| program.class_name(class)).collect();
    if let Some(first) = names.first().cloned() {
        names.push(first);
    }
    names.join(" -> ")
}

#[derive(Debug, Clone, Copy)]
struct Node {
    index: u32,
    lowlink: u32,
    on_stack: bool,
}

struct Tarjan<'p> {
    program: &'p Program,
    next_index: u32,
    nodes: FxHashMap<ClassId, Node>,
    stack: Vec<ClassId>,
    /// Components larger than one class, each ordered along superclass links
    cycles: Vec<Vec<ClassId>>,
}

impl<'p> Tarjan<'p> {
    fn new(program: &'p Program) -> Self {
        Self {
            program,
            next_index: 0,
            nodes: FxHashMap::default(),
            stack: Vec::new(),
            cycles: Vec::new(),
        }
    }

    fn strong_connect(&mut self, class: ClassId) {
        let index = self.next_index;
        self.next_index += 1;
        self.nodes.insert(
            class,
            Node {
                index,
                lowlink: index,
                on_stack: true,
            },
        );
        self.stack.push(class);

        if let Some(base) = self.program.superclass(class) {
            match self.nodes.get(&base).copied() {
                None => {
                    self.strong_connect(base);
                    if let Some(reached) = self.nodes.get(&base).map(|node| node.lowlink) {
                        self.lower(class, reached);
                    }
                }
                Some(node) if node.on_stack => self.lower(class, node.index),
                Some(_) => {}
            }
        }

        let Some(node) = self.nodes.get(&class).copied() else {
            return;
        };
        if node.lowlink != node.index {
            return;
        }
        let mut component = Vec::new();
        while let Some(member) = self.stack.pop() {
            if let Some(popped) = self.nodes.get_mut(&member) {
                popped.on_stack = false;
            }
            component.push(member);
            if member == class {
                break;
            }
        }
        if component.len() > 1 {
            self.cycles.push(self.along_superclasses(class, component.len()));
        }
    }

    fn lower(&mut self, class: ClassId, reached: u32) {
        if let Some(node) = self.nodes.get_mut(&class) {
            node.lowlink = node.lowlink.min(reached);
        }
    }

    /// The `len` classes of the cycle rooted at `first`, in inheritance order
    fn along_superclasses(&self, first: ClassId, len: usize) -> Vec<ClassId> {
        iter::successors(Some(first), |&class| self.program.superclass(class))
            .take(len)
            .collect()
    }
}
