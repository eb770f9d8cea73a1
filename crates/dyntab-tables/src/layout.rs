//! Two-phase layout of tables made of independently sized nodes.
//!
//! Phase 0 counts the instances of every category. Phase 1 loads them in
//! category order, sizes each node and records its offset in a
//! [`NodeIndexer`]; the result is a frozen [`LayoutPlan`]. Phase 2 allocates
//! the table once and lets every node write itself at its recorded offset,
//! resolving references to other nodes through the finished indexer.

use std::fmt;

use dyntab_repo::{CmObject, ConfigRepository, RepositoryExt};
use dyntab_types::{ObjectId, Token};

use crate::error::{TableError, TableResult};

// ---------------------------------------------------------------------------
// Node and category contracts
// ---------------------------------------------------------------------------

/// One serialized node of a table.
pub trait LayoutNode: Send + Sync + fmt::Debug {
    /// Token other nodes use to reference this one.
    fn token(&self) -> Token {
        Token::NULL
    }

    /// Serialized length in bytes.
    fn size(&self) -> TableResult<u64>;

    /// Write the node into `out`, which is exactly [`size`](Self::size)
    /// bytes long and zero-filled.
    fn populate(&self, out: &mut [u8], cx: &PopulateContext<'_>) -> TableResult<()>;
}

/// A kind of node, backed by one repository object id.
///
/// # Invariants
///
/// - `load` returns nodes in repository aggregation order.
/// - A required category with no instances fails the build.
/// - A singleton category with more than one instance fails the build.
pub trait NodeCategory: Send + Sync {
    fn name(&self) -> &'static str;

    fn object_id(&self) -> ObjectId;

    fn required(&self) -> bool;

    fn singleton(&self) -> bool;

    /// Fetch every instance and wrap each in its node type.
    fn load(&self, repo: &dyn ConfigRepository) -> TableResult<Vec<Box<dyn LayoutNode>>>;
}

/// Box a node.
pub fn boxed<N: LayoutNode + 'static>(node: N) -> Box<dyn LayoutNode> {
    Box::new(node)
}

/// A category whose instances are [`CmObject`] records of type `T`.
pub struct Category<T> {
    name: &'static str,
    required: bool,
    singleton: bool,
    check: Option<fn(&[T]) -> TableResult<()>>,
    node: fn(T) -> Box<dyn LayoutNode>,
}

impl<T: CmObject> Category<T> {
    pub fn new(name: &'static str, node: fn(T) -> Box<dyn LayoutNode>) -> Self {
        Self {
            name,
            required: false,
            singleton: false,
            check: None,
            node,
        }
    }

    /// At least one instance must exist.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// At most one instance may exist.
    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    /// Validate the loaded instances as a whole before any node is placed.
    pub fn with_check(mut self, check: fn(&[T]) -> TableResult<()>) -> Self {
        self.check = Some(check);
        self
    }
}

impl<T: CmObject> NodeCategory for Category<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn object_id(&self) -> ObjectId {
        T::OBJECT_ID
    }

    fn required(&self) -> bool {
        self.required
    }

    fn singleton(&self) -> bool {
        self.singleton
    }

    fn load(&self, repo: &dyn ConfigRepository) -> TableResult<Vec<Box<dyn LayoutNode>>> {
        let items: Vec<T> = repo.get_list_or_empty(Token::NULL)?;
        if let Some(check) = self.check {
            check(&items)?;
        }
        Ok(items.into_iter().map(self.node).collect())
    }
}

// ---------------------------------------------------------------------------
// Node indexer
// ---------------------------------------------------------------------------

/// Where one node landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub token: Token,
    pub category: &'static str,
    /// Byte offset from the start of the table.
    pub offset: u32,
    pub size: u32,
}

/// Offsets of every node, in layout order. Immutable once planned.
#[derive(Clone, Debug, Default)]
pub struct NodeIndexer {
    entries: Vec<IndexEntry>,
}

impl NodeIndexer {
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offset of the node carrying `token`.
    ///
    /// Scans linearly for an exact match. The null token never resolves.
    pub fn resolve(&self, token: Token) -> TableResult<u32> {
        if token.is_null() {
            tracing::error!("cannot resolve a reference to the null token");
            return Err(TableError::NotFound("reference to the null token".into()));
        }
        match self.entries.iter().find(|e| e.token == token) {
            Some(entry) => {
                tracing::debug!(
                    token = ?token,
                    category = entry.category,
                    offset = entry.offset,
                    "resolved node reference"
                );
                Ok(entry.offset)
            }
            None => {
                tracing::error!(token = ?token, "no node carries the referenced token");
                Err(TableError::NotFound(format!("node for {token:?}")))
            }
        }
    }
}

/// What a node sees while populating itself.
pub struct PopulateContext<'a> {
    pub repo: &'a dyn ConfigRepository,
    pub indexer: &'a NodeIndexer,
    /// Table revision being emitted.
    pub revision: u8,
}

impl PopulateContext<'_> {
    pub fn resolve(&self, token: Token) -> TableResult<u32> {
        self.indexer.resolve(token)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Length ceilings imposed by the table format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutLimits {
    pub max_node_len: u64,
    pub max_table_len: u64,
}

impl Default for LayoutLimits {
    fn default() -> Self {
        Self {
            max_node_len: u64::from(u16::MAX),
            max_table_len: u64::from(u32::MAX),
        }
    }
}

/// Categories of one table type, in their fixed order.
pub struct LayoutEngine {
    categories: Vec<Box<dyn NodeCategory>>,
    header_len: u64,
    limits: LayoutLimits,
}

impl LayoutEngine {
    /// An engine placing the first node right after `header_len` bytes.
    pub fn new(header_len: usize) -> Self {
        Self {
            categories: Vec::new(),
            header_len: header_len as u64,
            limits: LayoutLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: LayoutLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Append a category. Order of calls is layout order.
    pub fn category(mut self, category: impl NodeCategory + 'static) -> Self {
        self.categories.push(Box::new(category));
        self
    }

    pub fn categories(&self) -> impl Iterator<Item = &dyn NodeCategory> {
        self.categories.iter().map(|c| c.as_ref())
    }

    pub fn header_len(&self) -> usize {
        self.header_len as usize
    }

    pub fn limits(&self) -> LayoutLimits {
        self.limits
    }

    /// Phase 0: instance count per category.
    pub fn count(&self, repo: &dyn ConfigRepository) -> TableResult<Vec<u32>> {
        let mut counts = Vec::with_capacity(self.categories.len());
        for category in &self.categories {
            let count = repo.count_only(category.object_id())?;
            tracing::debug!(category = category.name(), count, "counted nodes");
            if category.required() && count == 0 {
                tracing::error!(category = category.name(), "required node category is empty");
                return Err(TableError::InvalidParameter(format!(
                    "no {} nodes",
                    category.name()
                )));
            }
            if category.singleton() && count > 1 {
                tracing::error!(
                    category = category.name(),
                    count,
                    "only one node of this category is allowed"
                );
                return Err(TableError::InvalidParameter(format!(
                    "{count} {} nodes, expected one",
                    category.name()
                )));
            }
            counts.push(count);
        }
        Ok(counts)
    }

    /// Phases 0 and 1: count, load, size, and index every node.
    pub fn plan(&self, repo: &dyn ConfigRepository) -> TableResult<LayoutPlan> {
        let counts = self.count(repo)?;
        let node_count: usize = counts.iter().map(|&c| c as usize).sum();

        let mut entries = Vec::new();
        entries
            .try_reserve_exact(node_count)
            .map_err(|_| TableError::OutOfResources(node_count * std::mem::size_of::<IndexEntry>()))?;
        let mut nodes: Vec<Box<dyn LayoutNode>> = Vec::with_capacity(node_count);

        let mut offset = self.header_len;
        for (category, &count) in self.categories.iter().zip(&counts) {
            if count == 0 {
                continue;
            }
            let loaded = category.load(repo)?;
            if loaded.len() != count as usize {
                return Err(TableError::InvalidParameter(format!(
                    "{} changed from {count} to {} nodes during the build",
                    category.name(),
                    loaded.len()
                )));
            }
            for node in loaded {
                let size = node.size()?;
                if size > self.limits.max_node_len {
                    tracing::error!(
                        category = category.name(),
                        size,
                        max = self.limits.max_node_len,
                        "node too large"
                    );
                    return Err(TableError::InvalidParameter(format!(
                        "{} node of {size} bytes exceeds {}",
                        category.name(),
                        self.limits.max_node_len
                    )));
                }
                let end = offset
                    .checked_add(size)
                    .filter(|&end| end <= self.limits.max_table_len)
                    .ok_or_else(|| {
                        tracing::error!(max = self.limits.max_table_len, "table too large");
                        TableError::InvalidParameter(format!(
                            "table exceeds {} bytes",
                            self.limits.max_table_len
                        ))
                    })?;
                let entry = IndexEntry {
                    token: node.token(),
                    category: category.name(),
                    offset: narrow(offset)?,
                    size: narrow(size)?,
                };
                tracing::debug!(
                    category = entry.category,
                    token = ?entry.token,
                    offset = entry.offset,
                    size = entry.size,
                    "placed node"
                );
                entries.push(entry);
                nodes.push(node);
                offset = end;
            }
        }

        Ok(LayoutPlan {
            header_len: self.header_len,
            total_len: offset,
            nodes,
            indexer: NodeIndexer { entries },
        })
    }
}

fn narrow(value: u64) -> TableResult<u32> {
    u32::try_from(value)
        .map_err(|_| TableError::InvalidParameter(format!("offset {value} exceeds u32")))
}

impl fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutEngine")
            .field(
                "categories",
                &self.categories.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("header_len", &self.header_len)
            .field("limits", &self.limits)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Output of phase 1: every node with its final offset.
#[derive(Debug)]
pub struct LayoutPlan {
    header_len: u64,
    total_len: u64,
    nodes: Vec<Box<dyn LayoutNode>>,
    indexer: NodeIndexer,
}

impl LayoutPlan {
    /// Table length including the header.
    pub fn total_len(&self) -> usize {
        self.total_len as usize
    }

    pub fn header_len(&self) -> usize {
        self.header_len as usize
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn indexer(&self) -> &NodeIndexer {
        &self.indexer
    }

    /// Phase 2: allocate the zeroed table and write every node.
    ///
    /// The header bytes are left zero for the caller to fill in.
    pub fn populate(&self, repo: &dyn ConfigRepository, revision: u8) -> TableResult<Vec<u8>> {
        let len = self.total_len();
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| TableError::OutOfResources(len))?;
        buf.resize(len, 0);

        let cx = PopulateContext {
            repo,
            indexer: &self.indexer,
            revision,
        };
        for (node, entry) in self.nodes.iter().zip(self.indexer.entries()) {
            let start = entry.offset as usize;
            let end = start + entry.size as usize;
            node.populate(&mut buf[start..end], &cx)?;
        }
        Ok(buf)
    }
}
