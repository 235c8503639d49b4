use crate::{
    AssociationShape, Error, ErrorKind, ModelMeta, Registry, Result, unpoison,
};
use convert_case::{Case, Casing};
use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
    str::FromStr,
    sync::{Arc, RwLock},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    HasMany,
    HasOne,
    BelongsTo,
    ManyToMany,
}

impl FromStr for RelationKind {
    type Err = Error;
    fn from_str(value: &str) -> Result<Self> {
        Ok(
            match value.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
                "has_many" | "hasmany" => RelationKind::HasMany,
                "has_one" | "hasone" => RelationKind::HasOne,
                "belongs_to" | "belongsto" => RelationKind::BelongsTo,
                "many_to_many" | "manytomany" | "many2many" => RelationKind::ManyToMany,
                _ => {
                    return Err(ErrorKind::invalid_model(format!(
                        "Unknown relation kind `{value}`"
                    )));
                }
            },
        )
    }
}

impl Display for RelationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RelationKind::HasMany => "has_many",
            RelationKind::HasOne => "has_one",
            RelationKind::BelongsTo => "belongs_to",
            RelationKind::ManyToMany => "many_to_many",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTable {
    pub table: String,
    /// Column of the join table pointing at the owner.
    pub foreign_key: String,
    /// Column of the join table pointing at the target.
    pub reference: String,
}

/// Resolved association between an owner model and a target model.
///
/// Column roles by kind:
/// - `HasMany` / `HasOne`: `foreign_key` lives on the target, `references` on the owner.
/// - `BelongsTo`: `foreign_key` lives on the owner, `references` on the target.
/// - `ManyToMany`: `references` on the owner and `foreign_key` on the target are the columns the
///   two join table columns point at.
#[derive(Debug)]
pub struct Relation {
    /// Rust field name of the association.
    pub name: &'static str,
    pub kind: RelationKind,
    pub owner: Arc<ModelMeta>,
    pub target: Arc<ModelMeta>,
    pub foreign_key: String,
    pub references: String,
    pub join: Option<JoinTable>,
}

impl Relation {
    /// The column on the owner whose values drive the lookup.
    pub fn owner_key(&self) -> &str {
        match self.kind {
            RelationKind::BelongsTo => &self.foreign_key,
            _ => &self.references,
        }
    }

    /// The column on the target matched against the owner key.
    pub fn target_key(&self) -> &str {
        match self.kind {
            RelationKind::BelongsTo => &self.references,
            _ => &self.foreign_key,
        }
    }
}

struct CachedRelation {
    generation: u64,
    relation: Arc<Relation>,
}

/// Per (table, association) cache of resolved relations.
///
/// An entry is valid only while the registry generation it was computed under is current.
pub struct RelationCatalog {
    registry: Arc<Registry>,
    relations: RwLock<HashMap<(String, String), CachedRelation>>,
}

impl RelationCatalog {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            relations: Default::default(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn resolve(&self, owner: &Arc<ModelMeta>, name: &str) -> Result<Arc<Relation>> {
        let key = (owner.table.clone(), name.to_string());
        if let Some(cached) = unpoison(self.relations.read()).get(&key) {
            if cached.generation == self.registry.generation() {
                return Ok(cached.relation.clone());
            }
        }
        let relation = Arc::new(self.build(owner, name)?);
        // Read after the build, which may have registered the target
        let generation = self.registry.generation();
        log::trace!(
            "Resolved relation `{}.{}` as {} (generation {generation})",
            owner.type_name,
            relation.name,
            relation.kind
        );
        unpoison(self.relations.write()).insert(
            key,
            CachedRelation {
                generation,
                relation: relation.clone(),
            },
        );
        Ok(relation)
    }

    /// Drops every cached relation.
    pub fn clear(&self) {
        unpoison(self.relations.write()).clear();
    }

    fn build(&self, owner: &Arc<ModelMeta>, name: &str) -> Result<Relation> {
        let association = owner.association(name).ok_or_else(|| ErrorKind::RelationNotFound {
            model: owner.type_name.to_string(),
            relation: name.to_string(),
        })?;
        let target = self.registry.model_for((association.target)())?;
        let tag = &association.tag;
        let invalid = |message: String| {
            ErrorKind::invalid_model(format!(
                "Relation `{}.{}`: {message}",
                owner.type_name, association.name
            ))
        };
        let owner_fk = tag
            .foreign_key
            .as_ref()
            .map(|v| v.column.clone())
            .unwrap_or_else(|| format!("{}_id", association.name.to_case(Case::Snake)));
        let kind = match (tag.relation, association.shape) {
            (Some(kind), _) => kind,
            (None, AssociationShape::Collection) if tag.join_table.is_some() => {
                RelationKind::ManyToMany
            }
            (None, AssociationShape::Collection) => RelationKind::HasMany,
            (None, AssociationShape::Reference) if owner.column(&owner_fk).is_some() => {
                RelationKind::BelongsTo
            }
            (None, AssociationShape::Reference) => RelationKind::HasOne,
        };
        let expected = match kind {
            RelationKind::HasMany | RelationKind::ManyToMany => AssociationShape::Collection,
            RelationKind::HasOne | RelationKind::BelongsTo => AssociationShape::Reference,
        };
        if association.shape != expected {
            return Err(invalid(format!(
                "a {kind} relation requires a {} field",
                match expected {
                    AssociationShape::Collection => "Vec<_>",
                    AssociationShape::Reference => "Option<_>",
                }
            )));
        }
        let owner_pk = || {
            tag.references
                .clone()
                .or_else(|| owner.primary_key().map(|v| v.column.clone()))
                .ok_or_else(|| invalid(format!("`{}` has no primary key", owner.type_name)))
        };
        let target_pk = |explicit: Option<&String>| {
            explicit
                .cloned()
                .or_else(|| target.primary_key().map(|v| v.column.clone()))
                .ok_or_else(|| invalid(format!("`{}` has no primary key", target.type_name)))
        };
        let (foreign_key, references, join) = match kind {
            RelationKind::HasMany | RelationKind::HasOne => {
                let foreign_key = tag
                    .foreign_key
                    .as_ref()
                    .map(|v| v.column.clone())
                    .unwrap_or_else(|| format!("{}_id", owner.snake_name()));
                (foreign_key, owner_pk()?, None)
            }
            RelationKind::BelongsTo => (owner_fk, target_pk(tag.references.as_ref())?, None),
            RelationKind::ManyToMany => {
                let join = JoinTable {
                    table: tag.join_table.clone().unwrap_or_else(|| {
                        format!(
                            "{}_{}",
                            owner.snake_name(),
                            association.name.to_case(Case::Snake)
                        )
                    }),
                    foreign_key: tag
                        .join_fk
                        .clone()
                        .unwrap_or_else(|| format!("{}_id", owner.snake_name())),
                    reference: tag
                        .join_ref
                        .clone()
                        .unwrap_or_else(|| format!("{}_id", target.snake_name())),
                };
                let target_key = target_pk(tag.foreign_key.as_ref().map(|v| &v.column))?;
                (target_key, owner_pk()?, Some(join))
            }
        };
        let relation = Relation {
            name: association.name,
            kind,
            owner: owner.clone(),
            target: target.clone(),
            foreign_key,
            references,
            join,
        };
        if owner.column(relation.owner_key()).is_none() {
            return Err(invalid(format!(
                "`{}` has no column `{}`",
                owner.type_name,
                relation.owner_key()
            )));
        }
        if target.column(relation.target_key()).is_none() {
            return Err(invalid(format!(
                "`{}` has no column `{}`",
                target.type_name,
                relation.target_key()
            )));
        }
        Ok(relation)
    }
}
