use crate::{
    Context, Db, Executor, KeyValue, ModelMeta, Record, Relation, RelationKind, Result,
    SqlBuilder, Value,
};
use futures::{FutureExt, future::BoxFuture};
use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

/// Extra clauses applied to the query loading one preload level.
pub type Refinement = Arc<dyn Fn(&mut SqlBuilder) + Send + Sync>;

/// Requested association paths merged by common prefix.
///
/// `"orders"` and `"orders.products"` share the `orders` node, so orders are loaded once.
#[derive(Default, Clone)]
pub struct PreloadTree {
    nodes: Vec<PreloadNode>,
}

#[derive(Clone)]
pub struct PreloadNode {
    pub name: String,
    pub refine: Option<Refinement>,
    pub children: PreloadTree,
}

impl PreloadTree {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a dot separated path, `refine` applies to its last segment.
    pub fn insert(&mut self, path: &str, refine: Option<Refinement>) {
        let segments = path
            .split('.')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>();
        if segments.is_empty() {
            log::warn!("Ignoring the empty preload path `{path}`");
            return;
        }
        let mut tree = self;
        for (i, segment) in segments.iter().enumerate() {
            let position = match tree.nodes.iter().position(|v| v.name == *segment) {
                Some(position) => position,
                None => {
                    tree.nodes.push(PreloadNode {
                        name: segment.to_string(),
                        refine: None,
                        children: Default::default(),
                    });
                    tree.nodes.len() - 1
                }
            };
            let node = &mut tree.nodes[position];
            if i + 1 == segments.len() && refine.is_some() {
                node.refine = refine.clone();
            }
            tree = &mut node.children;
        }
    }

    pub fn nodes(&self) -> &[PreloadNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Debug for PreloadTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes.iter()).finish()
    }
}

impl Debug for PreloadNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreloadNode")
            .field("name", &self.name)
            .field("refined", &self.refine.is_some())
            .field("children", &self.children)
            .finish()
    }
}

/// Records loaded for one level, with the indexes of the records each owner key receives.
struct Loaded {
    records: Vec<Box<dyn Record>>,
    groups: HashMap<KeyValue, Vec<usize>>,
}

impl Loaded {
    fn empty() -> Self {
        Loaded {
            records: Vec::new(),
            groups: HashMap::new(),
        }
    }
}

/// Resolves every segment of `tree`, so a misspelled path fails even when nothing gets loaded.
pub(crate) fn resolve_tree(db: &Db, owner: &Arc<ModelMeta>, tree: &PreloadTree) -> Result<()> {
    for node in &tree.nodes {
        let relation = db.relations().resolve(owner, &node.name)?;
        resolve_tree(db, &relation.target, &node.children)?;
    }
    Ok(())
}

/// Loads every association in `tree` for all the `parents`, one query per relation and level
/// (two for many to many), whatever the number of parents.
pub(crate) fn load_level<'a, E: Executor>(
    db: &'a Db,
    executor: &'a mut E,
    owner: Arc<ModelMeta>,
    mut parents: Vec<&'a mut dyn Record>,
    tree: &'a PreloadTree,
) -> BoxFuture<'a, Result<()>> {
    async move {
        for node in &tree.nodes {
            let relation = db.relations().resolve(&owner, &node.name)?;
            let owner_key = owner.require_column(relation.owner_key())?;
            let mut keys = Vec::with_capacity(parents.len());
            let mut values = Vec::new();
            let mut seen = HashSet::new();
            for parent in parents.iter() {
                let value = owner_key.get(&**parent)?;
                let key = if relation.kind == RelationKind::BelongsTo && value.is_zero() {
                    None
                } else {
                    value.as_key()
                };
                if let Some(key) = &key {
                    if seen.insert(key.clone()) {
                        values.push(value);
                    }
                }
                keys.push(key);
            }
            let mut loaded = if values.is_empty() {
                Loaded::empty()
            } else if relation.kind == RelationKind::ManyToMany {
                load_many_to_many(db, executor, &relation, node, values).await?
            } else {
                load_direct(db, executor, &relation, node, values).await?
            };
            if !node.children.is_empty() && !loaded.records.is_empty() {
                let children = loaded
                    .records
                    .iter_mut()
                    .map(|v| v.as_mut() as &mut dyn Record)
                    .collect();
                load_level(
                    db,
                    &mut *executor,
                    relation.target.clone(),
                    children,
                    &node.children,
                )
                .await?;
            }
            for record in loaded.records.iter_mut() {
                if let Some(hooks) = record.hooks() {
                    hooks.after_find()?;
                }
            }
            distribute(&relation, &mut parents, &keys, loaded)?;
        }
        Ok(())
    }
    .boxed()
}

/// Selects the targets whose `column` is in `values`, after the path refinement so the key is
/// qualified with the alias it may set.
fn target_query(
    db: &Db,
    relation: &Relation,
    node: &PreloadNode,
    column: &str,
    values: Vec<Value>,
    builder: &mut SqlBuilder,
) {
    let dialect = db.dialect();
    builder.table(&relation.target.table);
    if let Some(refine) = &node.refine {
        refine(&mut *builder);
    }
    let mut qualified = builder.qualifier(dialect);
    qualified.push('.');
    dialect.write_identifier(&mut qualified, column);
    builder.filter_in(&qualified, values);
}

async fn load_direct<E: Executor>(
    db: &Db,
    executor: &mut E,
    relation: &Relation,
    node: &PreloadNode,
    values: Vec<Value>,
) -> Result<Loaded> {
    let target = &relation.target;
    let statement = {
        let mut builder = db.builders().acquire();
        target_query(db, relation, node, relation.target_key(), values, &mut *builder);
        builder.render_select(db.dialect())?
    };
    let rows = db.fetch(executor, &statement).await?;
    let records = db.scanner().scan_records(target, &rows)?;
    let key = target.require_column(relation.target_key())?;
    let mut groups: HashMap<KeyValue, Vec<usize>> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        if let Some(key) = key.get(&**record)?.as_key() {
            groups.entry(key).or_default().push(i);
        }
    }
    Ok(Loaded { records, groups })
}

async fn load_many_to_many<E: Executor>(
    db: &Db,
    executor: &mut E,
    relation: &Relation,
    node: &PreloadNode,
    values: Vec<Value>,
) -> Result<Loaded> {
    let Some(join) = &relation.join else {
        return Err(crate::ErrorKind::invalid_model(format!(
            "Relation `{}.{}` has no join table",
            relation.owner.type_name, relation.name
        )));
    };
    let dialect = db.dialect();
    let statement = {
        let mut builder = db.builders().acquire();
        let mut qualified = dialect.quoted(&join.table);
        qualified.push('.');
        let prefix = qualified.len();
        dialect.write_identifier(&mut qualified, &join.foreign_key);
        let owner_column = qualified.clone();
        qualified.truncate(prefix);
        dialect.write_identifier(&mut qualified, &join.reference);
        builder
            .table(&join.table)
            .select([&owner_column, &qualified])
            .filter_in(&owner_column, values);
        builder.render_select(dialect)?
    };
    let pairs = db.fetch(executor, &statement).await?;
    let mut links = Vec::with_capacity(pairs.len());
    let mut references = Vec::new();
    let mut seen = HashSet::new();
    let mut linked = HashSet::new();
    for row in &pairs {
        let (Some(owner), Some(reference)) = (row.values.first(), row.values.get(1)) else {
            continue;
        };
        let (Some(owner), Some(key)) = (owner.as_key(), reference.as_key()) else {
            continue;
        };
        if seen.insert(key.clone()) {
            references.push(reference.clone());
        }
        if linked.insert((owner.clone(), key.clone())) {
            links.push((owner, key));
        }
    }
    if references.is_empty() {
        return Ok(Loaded::empty());
    }
    let target = &relation.target;
    let statement = {
        let mut builder = db.builders().acquire();
        target_query(db, relation, node, &relation.foreign_key, references, &mut *builder);
        builder.render_select(dialect)?
    };
    let rows = db.fetch(executor, &statement).await?;
    let records = db.scanner().scan_records(target, &rows)?;
    let key = target.require_column(&relation.foreign_key)?;
    let mut positions: HashMap<KeyValue, usize> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        if let Some(key) = key.get(&**record)?.as_key() {
            positions.entry(key).or_insert(i);
        }
    }
    let mut groups: HashMap<KeyValue, Vec<usize>> = HashMap::new();
    for (owner, key) in links {
        if let Some(&i) = positions.get(&key) {
            groups.entry(owner).or_default().push(i);
        }
    }
    // Keep the order of the target query inside each group
    for group in groups.values_mut() {
        group.sort_unstable();
    }
    Ok(Loaded { records, groups })
}

fn distribute(
    relation: &Relation,
    parents: &mut [&mut dyn Record],
    keys: &[Option<KeyValue>],
    loaded: Loaded,
) -> Result<()> {
    let single = matches!(relation.kind, RelationKind::HasOne | RelationKind::BelongsTo);
    let assignments = keys
        .iter()
        .map(|key| {
            let mut indexes = key
                .as_ref()
                .and_then(|v| loaded.groups.get(v))
                .cloned()
                .unwrap_or_default();
            if single {
                indexes.truncate(1);
            }
            indexes
        })
        .collect::<Vec<_>>();
    let mut uses = vec![0usize; loaded.records.len()];
    for i in assignments.iter().flatten() {
        uses[*i] += 1;
    }
    let mut slots = loaded.records.into_iter().map(Some).collect::<Vec<_>>();
    for (parent, indexes) in parents.iter_mut().zip(assignments) {
        let mut related = Vec::with_capacity(indexes.len());
        for i in indexes {
            uses[i] -= 1;
            let record = if uses[i] == 0 {
                slots[i].take()
            } else {
                slots[i].as_ref().map(|v| v.clone_record())
            };
            related.extend(record);
        }
        parent
            .assign_association(relation.name, related)
            .with_context(|| {
                format!(
                    "While assigning `{}.{}`",
                    relation.owner.type_name, relation.name
                )
            })?;
    }
    Ok(())
}
