//! Fixtures shared by the integration tests
#![allow(dead_code)]

use schema_mirror::schema::types::{Column, ColumnDefault, ForeignKey, Index, ReferentialAction, Schema, Table};

pub fn schema(tables: Vec<Table>) -> Schema {
    tables.into_iter().fold(Schema::new(), Schema::with_table)
}

/// `users(id int not null, name varchar(100) null)`
pub fn users_table() -> Table {
    Table::new("users")
        .with_column(Column::new("id", "int", 1).extra("auto_increment"))
        .with_column(Column::new("name", "varchar(100)", 2).nullable(true))
        .with_index(Index::primary(&["id"]))
}

/// A table exercising every attribute the differ compares
pub fn posts_table() -> Table {
    Table::new("posts")
        .with_column(Column::new("id", "bigint unsigned", 1).extra("auto_increment"))
        .with_column(Column::new("author_id", "int", 2))
        .with_column(Column::new("slug", "varchar(191)", 3).comment("url slug"))
        .with_column(
            Column::new("published_at", "datetime", 4)
                .nullable(true)
                .default(ColumnDefault::Null),
        )
        .with_column(
            Column::new("created_at", "timestamp", 5)
                .default(ColumnDefault::Expression("CURRENT_TIMESTAMP".to_string())),
        )
        .with_column(
            Column::new("status", "varchar(16)", 6).default(ColumnDefault::Literal("draft".to_string())),
        )
        .with_index(Index::primary(&["id"]))
        .with_index(Index::unique("uniq_slug", &["slug"]))
        .with_index(Index::new("idx_author_published", &["author_id", "published_at"]))
        .with_foreign_key(
            ForeignKey::new("fk_posts_author", &["author_id"], "users", &["id"])
                .on_delete(ReferentialAction::Cascade)
                .on_update(ReferentialAction::Restrict),
        )
}

/// A schema with a handful of related tables
pub fn blog_schema() -> Schema {
    schema(vec![users_table(), posts_table()])
}
