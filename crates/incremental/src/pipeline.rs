//! Pipeline declaration.

use crate::driver::DriverStateTableBuilder;
use crate::node::{
    batch_fn, transform_fn, BatchFn, BatchNode, CombineNode, IncrementalNode, InputNode,
    NodeHandle, NodeId, NodeValue, TransformFn, TransformNode,
};
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};
use hashbrown::HashMap;
use skein_core::{default_comparer, CancellationToken, Fault, Result, SharedComparer};

/// A node whose element type has been erased, so the driver can pull it.
pub(crate) trait ErasedNode: Send + Sync {
    fn id(&self) -> NodeId;
    fn kind(&self) -> &'static str;
    fn pull(&self, builder: &mut DriverStateTableBuilder<'_>) -> Result<()>;
}

struct Registered<T>(NodeHandle<T>);

impl<T: NodeValue> ErasedNode for Registered<T> {
    fn id(&self) -> NodeId {
        self.0.id()
    }

    fn kind(&self) -> &'static str {
        self.0.kind()
    }

    fn pull(&self, builder: &mut DriverStateTableBuilder<'_>) -> Result<()> {
        builder.get_latest_state_table_for_node(&self.0).map(drop)
    }
}

/// The declared shape of an incremental computation.
///
/// Nodes are declared once, each from handles of nodes declared before it, so
/// the topology is acyclic by construction. User functions are supplied here
/// and never per run; a [`Driver`](crate::Driver) then runs the pipeline as
/// often as its inputs change.
///
/// Handles are only meaningful for the pipeline that created them. Declaring
/// a node from another pipeline's handle panics; a driver given one reports
/// [`Error::UnknownNode`](skein_core::Error::UnknownNode).
///
/// # Failing transforms
///
/// Only the `try_*` forms can fail: a returned `Err(fault)` faults the node
/// and everything downstream of it. The infallible forms (`select`, `batch`,
/// ...) are not guarded, so a panic in their function is never turned into a
/// fault and unwinds out of [`Driver::run`](crate::Driver::run). Hosts whose
/// functions can fail should use the `try_*` forms.
///
/// # Example
///
/// ```
/// use skein_incremental::{Driver, Pipeline};
/// use skein_core::CancellationToken;
///
/// let mut pipeline = Pipeline::new();
/// let files = pipeline.input::<String>();
/// let lengths = pipeline.select(&files, |f| f.len());
/// let total = pipeline.batch(&lengths, |lens| lens.iter().sum::<usize>());
///
/// let mut driver = Driver::new(pipeline);
/// driver.set_input(&files, vec!["a.rs".to_string(), "lib.rs".to_string()]).unwrap();
/// let result = driver.run(&CancellationToken::new()).unwrap();
/// assert_eq!(result.table(&total).unwrap().batch(), vec![10]);
/// ```
pub struct Pipeline {
    id: u32,
    nodes: Vec<Arc<dyn ErasedNode>>,
    names: HashMap<NodeId, String>,
}

static NEXT_PIPELINE_ID: AtomicU32 = AtomicU32::new(0);

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            id: NEXT_PIPELINE_ID.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
            names: HashMap::new(),
        }
    }
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    /// Returns the number of declared nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no node has been declared.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns true if `id` names a node of this pipeline.
    pub fn contains(&self, id: NodeId) -> bool {
        (id.0 as usize) < self.nodes.len()
    }

    /// Returns true if `node` was declared by this pipeline.
    pub fn owns<T: NodeValue>(&self, node: &NodeHandle<T>) -> bool {
        node.pipeline() == self.id && self.contains(node.id())
    }

    fn assert_owned<T: NodeValue>(&self, node: &NodeHandle<T>) {
        assert!(self.owns(node), "{} belongs to another pipeline", node.id());
    }

    /// Returns the kind of the node with the given id.
    pub fn kind_of(&self, id: NodeId) -> Option<&'static str> {
        self.nodes.get(id.0 as usize).map(|node| node.kind())
    }

    /// Returns an iterator over all node ids in declaration order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|node| node.id())
    }

    pub(crate) fn nodes(&self) -> &[Arc<dyn ErasedNode>] {
        &self.nodes
    }

    /// Attaches a human-readable name to a node for run steps and logs.
    ///
    /// # Panics
    ///
    /// Panics if `node` belongs to another pipeline.
    pub fn set_tracking_name<T: NodeValue>(&mut self, node: &NodeHandle<T>, name: impl Into<String>) {
        self.assert_owned(node);
        self.names.insert(node.id(), name.into());
    }

    /// Returns the tracking name of a node, if one was set.
    pub fn tracking_name(&self, id: NodeId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Declares a node of a custom kind.
    ///
    /// `build` receives the id the node is registered under.
    pub fn add_node<T, N, F>(&mut self, build: F) -> NodeHandle<T>
    where
        T: NodeValue,
        N: IncrementalNode<T> + 'static,
        F: FnOnce(NodeId) -> N,
    {
        let id = NodeId(self.nodes.len() as u32);
        let handle = NodeHandle::new(id, self.id, Arc::new(build(id)));
        self.nodes.push(Arc::new(Registered(handle.clone())));
        handle
    }

    // -----------------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------------

    /// Declares an input whose values are set with
    /// [`Driver::set_input`](crate::Driver::set_input).
    pub fn input<T: NodeValue + PartialEq>(&mut self) -> NodeHandle<T> {
        self.input_with_comparer(default_comparer())
    }

    /// Declares an input diffed with a custom comparer.
    pub fn input_with_comparer<T: NodeValue>(&mut self, comparer: SharedComparer<T>) -> NodeHandle<T> {
        self.add_node(|id| InputNode::new(id, comparer))
    }

    // -----------------------------------------------------------------------
    // Transforms
    // -----------------------------------------------------------------------

    /// Declares a one-to-one transform.
    pub fn select<I, O, F>(&mut self, source: &NodeHandle<I>, func: F) -> NodeHandle<O>
    where
        I: NodeValue,
        O: NodeValue + PartialEq,
        F: Fn(&I) -> O + Send + Sync + 'static,
    {
        let func = transform_fn(move |value, _| Ok(vec![func(value)]));
        self.add_transform("select", source, func, default_comparer())
    }

    /// Declares a one-to-many transform.
    pub fn select_many<I, O, F>(&mut self, source: &NodeHandle<I>, func: F) -> NodeHandle<O>
    where
        I: NodeValue,
        O: NodeValue + PartialEq,
        F: Fn(&I) -> Vec<O> + Send + Sync + 'static,
    {
        let func = transform_fn(move |value, _| Ok(func(value)));
        self.add_transform("select_many", source, func, default_comparer())
    }

    /// Declares a filter keeping the values `predicate` accepts.
    pub fn filter<T, F>(&mut self, source: &NodeHandle<T>, predicate: F) -> NodeHandle<T>
    where
        T: NodeValue + PartialEq,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let func = transform_fn(move |value: &T, _| {
            Ok(if predicate(value) { vec![value.clone()] } else { Vec::new() })
        });
        self.add_transform("filter", source, func, default_comparer())
    }

    /// Declares a fallible one-to-one transform.
    pub fn try_select<I, O, F>(&mut self, source: &NodeHandle<I>, func: F) -> NodeHandle<O>
    where
        I: NodeValue,
        O: NodeValue + PartialEq,
        F: Fn(&I) -> core::result::Result<O, Fault> + Send + Sync + 'static,
    {
        let func = transform_fn(move |value, _| func(value).map(|out| vec![out]));
        self.add_transform("select", source, func, default_comparer())
    }

    /// Declares a fallible, cancellable one-to-many transform with a custom
    /// comparer. Every other transform form is a shorthand for this one.
    pub fn try_select_many<I, O, F>(
        &mut self,
        source: &NodeHandle<I>,
        func: F,
        comparer: SharedComparer<O>,
    ) -> NodeHandle<O>
    where
        I: NodeValue,
        O: NodeValue,
        F: Fn(&I, &CancellationToken) -> core::result::Result<Vec<O>, Fault> + Send + Sync + 'static,
    {
        self.add_transform("select_many", source, transform_fn(func), comparer)
    }

    fn add_transform<I: NodeValue, O: NodeValue>(
        &mut self,
        kind: &'static str,
        source: &NodeHandle<I>,
        func: TransformFn<I, O>,
        comparer: SharedComparer<O>,
    ) -> NodeHandle<O> {
        self.assert_owned(source);
        let source = source.clone();
        self.add_node(move |id| TransformNode::new(id, kind, source, func, comparer))
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    /// Declares a batch reducing the whole upstream to one value.
    pub fn batch<I, O, F>(&mut self, source: &NodeHandle<I>, func: F) -> NodeHandle<O>
    where
        I: NodeValue,
        O: NodeValue + PartialEq,
        F: Fn(&[I]) -> O + Send + Sync + 'static,
    {
        let func = batch_fn(move |values, _| Ok(vec![func(values)]));
        self.add_batch(source, func, default_comparer())
    }

    /// Declares a batch reducing the whole upstream to any number of values.
    pub fn batch_many<I, O, F>(&mut self, source: &NodeHandle<I>, func: F) -> NodeHandle<O>
    where
        I: NodeValue,
        O: NodeValue + PartialEq,
        F: Fn(&[I]) -> Vec<O> + Send + Sync + 'static,
    {
        let func = batch_fn(move |values, _| Ok(func(values)));
        self.add_batch(source, func, default_comparer())
    }

    /// Declares a fallible batch reducing the whole upstream to one value.
    pub fn try_batch<I, O, F>(&mut self, source: &NodeHandle<I>, func: F) -> NodeHandle<O>
    where
        I: NodeValue,
        O: NodeValue + PartialEq,
        F: Fn(&[I]) -> core::result::Result<O, Fault> + Send + Sync + 'static,
    {
        let func = batch_fn(move |values, _| func(values).map(|out| vec![out]));
        self.add_batch(source, func, default_comparer())
    }

    /// Declares a fallible, cancellable batch with a custom comparer. Every
    /// other batch form is a shorthand for this one.
    pub fn try_batch_many<I, O, F>(
        &mut self,
        source: &NodeHandle<I>,
        func: F,
        comparer: SharedComparer<O>,
    ) -> NodeHandle<O>
    where
        I: NodeValue,
        O: NodeValue,
        F: Fn(&[I], &CancellationToken) -> core::result::Result<Vec<O>, Fault> + Send + Sync + 'static,
    {
        self.add_batch(source, batch_fn(func), comparer)
    }

    /// Declares a batch collecting all upstream values into one `Vec`.
    pub fn collect<T: NodeValue + PartialEq>(&mut self, source: &NodeHandle<T>) -> NodeHandle<Vec<T>> {
        self.batch(source, |values: &[T]| values.to_vec())
    }

    fn add_batch<I: NodeValue, O: NodeValue>(
        &mut self,
        source: &NodeHandle<I>,
        func: BatchFn<I, O>,
        comparer: SharedComparer<O>,
    ) -> NodeHandle<O> {
        self.assert_owned(source);
        let source = source.clone();
        self.add_node(move |id| BatchNode::new(id, source, func, comparer))
    }

    // -----------------------------------------------------------------------
    // Combines
    // -----------------------------------------------------------------------

    /// Declares a node pairing each left value with the single right value.
    pub fn combine<L, R>(&mut self, left: &NodeHandle<L>, right: &NodeHandle<R>) -> NodeHandle<(L, R)>
    where
        L: NodeValue + PartialEq,
        R: NodeValue + PartialEq,
    {
        self.combine_with_comparer(left, right, default_comparer())
    }

    /// Declares a combine diffed with a custom comparer.
    pub fn combine_with_comparer<L: NodeValue, R: NodeValue>(
        &mut self,
        left: &NodeHandle<L>,
        right: &NodeHandle<R>,
        comparer: SharedComparer<(L, R)>,
    ) -> NodeHandle<(L, R)> {
        self.assert_owned(left);
        self.assert_owned(right);
        let (left, right) = (left.clone(), right.clone());
        self.add_node(move |id| CombineNode::new(id, left, right, comparer))
    }
}
