use crate::{ErrorKind, RelationKind, Result, consume_while};

/// Foreign key declared with `fk:<Table.Field>` (or `fk:<column>` when the table is implied).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: Option<String>,
    pub column: String,
}

/// Parsed field annotation.
///
/// The annotation is a list of `key[:value]` entries separated by semicolons or whitespace. Keys
/// are case insensitive, values may be single quoted to contain separators:
///
/// ```rust
/// use keel_core::Tag;
/// let tag = Tag::parse("column:user_name; size:64 notnull default:'n/a'").unwrap();
/// assert_eq!(tag.column.as_deref(), Some("user_name"));
/// assert_eq!(tag.size, Some(64));
/// assert!(tag.not_null);
/// assert_eq!(tag.default.as_deref(), Some("'n/a'"));
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tag {
    pub column: Option<String>,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub size: Option<u32>,
    pub unique: bool,
    pub not_null: bool,
    /// Literal SQL text, quotes included.
    pub default: Option<String>,
    pub foreign_key: Option<ForeignKey>,
    pub auto_time: bool,
    pub auto_update: bool,
    pub relation: Option<RelationKind>,
    pub references: Option<String>,
    pub join_table: Option<String>,
    pub join_fk: Option<String>,
    pub join_ref: Option<String>,
}

impl Tag {
    pub fn parse(raw: &str) -> Result<Tag> {
        let mut tag = Tag::default();
        for (key, value) in Self::entries(raw)? {
            let required = || {
                value.filter(|v| !v.is_empty()).map(str::to_string).ok_or_else(|| {
                    ErrorKind::invalid_model(format!("Tag key `{key}` requires a value in `{raw}`"))
                })
            };
            match key.to_ascii_lowercase().as_str() {
                "column" => tag.column = Some(required()?),
                "pk" | "primary_key" | "primarykey" => tag.primary_key = true,
                "auto" | "auto_increment" | "autoincrement" => tag.auto_increment = true,
                "size" => {
                    let size = required()?;
                    tag.size = Some(size.parse().map_err(|_| {
                        ErrorKind::invalid_model(format!(
                            "Tag key `size` expects a positive integer, found `{size}` in `{raw}`"
                        ))
                    })?);
                }
                "unique" => tag.unique = true,
                "notnull" | "not_null" => tag.not_null = true,
                "default" => tag.default = Some(required()?),
                "fk" | "foreign_key" | "foreignkey" => {
                    let target = required()?;
                    tag.foreign_key = Some(match target.split_once('.') {
                        Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                            ForeignKey {
                                table: Some(table.to_string()),
                                column: column.to_string(),
                            }
                        }
                        None => ForeignKey {
                            table: None,
                            column: target,
                        },
                        _ => {
                            return Err(ErrorKind::invalid_model(format!(
                                "Tag key `fk` expects `Table.Field`, found `{target}` in `{raw}`"
                            )));
                        }
                    });
                }
                "auto_time" | "autocreatetime" | "auto_create_time" => tag.auto_time = true,
                "auto_update" | "autoupdatetime" | "auto_update_time" => tag.auto_update = true,
                "relation" => tag.relation = Some(required()?.parse()?),
                "has_many" => tag.relation = Some(RelationKind::HasMany),
                "has_one" => tag.relation = Some(RelationKind::HasOne),
                "belongs_to" => tag.relation = Some(RelationKind::BelongsTo),
                "many_to_many" => tag.relation = Some(RelationKind::ManyToMany),
                "references" => tag.references = Some(required()?),
                "join_table" | "many2many" => tag.join_table = Some(required()?),
                "join_fk" | "join_foreign_key" => tag.join_fk = Some(required()?),
                "join_ref" | "join_references" => tag.join_ref = Some(required()?),
                _ => log::warn!("Ignoring unknown tag key `{key}` in `{raw}`"),
            }
        }
        Ok(tag)
    }

    /// The tag describes an association rather than a plain column.
    pub fn has_association_hints(&self) -> bool {
        self.relation.is_some()
            || self.join_table.is_some()
            || self.join_fk.is_some()
            || self.join_ref.is_some()
    }

    fn entries(raw: &str) -> Result<Vec<(&str, Option<&str>)>> {
        let mut result = Vec::new();
        let mut input = raw;
        loop {
            consume_while(&mut input, |c| *c == ';' || c.is_whitespace());
            if input.is_empty() {
                break;
            }
            let key = consume_while(&mut input, |c| {
                *c != ':' && *c != ';' && !c.is_whitespace()
            });
            let value = if let Some(rest) = input.strip_prefix(':') {
                input = rest;
                if input.starts_with('\'') {
                    let end = input[1..]
                        .find('\'')
                        .map(|v| v + 2)
                        .ok_or_else(|| {
                            ErrorKind::invalid_model(format!("Unterminated quote in tag `{raw}`"))
                        })?;
                    let value = &input[..end];
                    input = &input[end..];
                    Some(value)
                } else {
                    Some(consume_while(&mut input, |c| {
                        *c != ';' && !c.is_whitespace()
                    }))
                }
            } else {
                None
            };
            if key.is_empty() {
                return Err(ErrorKind::invalid_model(format!(
                    "Empty key in tag `{raw}`"
                )));
            }
            result.push((key, value));
        }
        Ok(result)
    }
}
