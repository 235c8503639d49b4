#[cfg(test)]
mod tests {
    use keel_core::{ErrorKind, ForeignKey, RelationKind, Tag};

    #[test]
    fn empty() {
        assert_eq!(Tag::parse("").unwrap(), Tag::default());
        assert_eq!(Tag::parse(" ; ;").unwrap(), Tag::default());
    }

    #[test]
    fn flags_and_values() {
        let tag = Tag::parse("column:email;size:128;UNIQUE;NotNull").unwrap();
        assert_eq!(tag.column.as_deref(), Some("email"));
        assert_eq!(tag.size, Some(128));
        assert!(tag.unique);
        assert!(tag.not_null);
        assert!(!tag.primary_key);

        let tag = Tag::parse("pk auto").unwrap();
        assert!(tag.primary_key);
        assert!(tag.auto_increment);

        let tag = Tag::parse("auto_time;auto_update").unwrap();
        assert!(tag.auto_time);
        assert!(tag.auto_update);
    }

    #[test]
    fn quoted_default() {
        let tag = Tag::parse("default:'a; b c';size:10").unwrap();
        assert_eq!(tag.default.as_deref(), Some("'a; b c'"));
        assert_eq!(tag.size, Some(10));
        let tag = Tag::parse("default:0").unwrap();
        assert_eq!(tag.default.as_deref(), Some("0"));
    }

    #[test]
    fn foreign_keys() {
        let tag = Tag::parse("fk:users.id").unwrap();
        assert_eq!(
            tag.foreign_key,
            Some(ForeignKey {
                table: Some("users".into()),
                column: "id".into(),
            })
        );
        let tag = Tag::parse("fk:owner_id").unwrap();
        assert_eq!(
            tag.foreign_key,
            Some(ForeignKey {
                table: None,
                column: "owner_id".into(),
            })
        );
        assert!(Tag::parse("fk:users.").is_err());
    }

    #[test]
    fn associations() {
        let tag = Tag::parse("relation:many_to_many;join_table:user_roles;join_fk:u;join_ref:r")
            .unwrap();
        assert_eq!(tag.relation, Some(RelationKind::ManyToMany));
        assert_eq!(tag.join_table.as_deref(), Some("user_roles"));
        assert_eq!(tag.join_fk.as_deref(), Some("u"));
        assert_eq!(tag.join_ref.as_deref(), Some("r"));
        assert!(tag.has_association_hints());

        let tag = Tag::parse("relation:belongs_to;references:code").unwrap();
        assert_eq!(tag.relation, Some(RelationKind::BelongsTo));
        assert_eq!(tag.references.as_deref(), Some("code"));

        assert!(!Tag::parse("column:x").unwrap().has_association_hints());
    }

    #[test]
    fn malformed() {
        for raw in [
            "size:big",
            "size:-1",
            "column",
            "column:",
            "relation:sometimes",
            "default:'open",
        ] {
            let error = Tag::parse(raw).expect_err(raw);
            assert!(
                matches!(ErrorKind::of(&error), Some(ErrorKind::InvalidModel(..))),
                "`{raw}` gave {error:#}"
            );
        }
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let tag = Tag::parse("comment:whatever;unique").unwrap();
        assert!(tag.unique);
    }
}
