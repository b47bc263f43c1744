//! Round trips against a real PostgreSQL.
//!
//! Every test returns early when `DATABASE_URL` is not set. Tables are
//! `TEMP` and the pool holds a single connection, so each test sees only its
//! own rows.

use pgrecord::{Db, DbConfig, MutateOptions, OrmError, OrmResult, Params, Record, SelectOptions};
use uuid::Uuid;

const SCHEMA: &str = "
    CREATE TEMP TABLE todos (
        id          bigserial PRIMARY KEY,
        title       text        NOT NULL,
        description text,
        priority    text        NOT NULL DEFAULT 'medium',
        is_done     boolean     NOT NULL DEFAULT false,
        user_id     uuid        NOT NULL,
        created_by  uuid,
        updated_by  uuid,
        created_at  timestamptz NOT NULL DEFAULT now(),
        updated_at  timestamptz,
        deleted_at  timestamptz
    );
    CREATE TEMP TABLE label_todos (
        id      bigserial PRIMARY KEY,
        name    text NOT NULL,
        user_id uuid NOT NULL,
        created_by uuid,
        updated_by uuid,
        UNIQUE (user_id, name)
    );
";

async fn try_connect() -> Option<Db> {
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let db = Db::connect(&DbConfig::new(database_url).max_connections(1))
        .expect("Failed to build pool for DATABASE_URL");
    let client = db.client().get().await.expect("Failed to connect");
    client
        .batch_execute(SCHEMA)
        .await
        .expect("Failed to create temp tables");
    drop(client);
    Some(db)
}

#[derive(Debug, Default, Record)]
struct NewTodo {
    #[orm(column = "title")]
    title: String,
    #[orm(column = "description", nullable)]
    description: Option<String>,
    #[orm(column = "priority", omitempty)]
    priority: String,
    #[orm(column = "user_id")]
    user_id: Uuid,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct TodoRow {
    #[orm(column = "id")]
    id: i64,
    #[orm(column = "title")]
    title: String,
    #[orm(column = "description")]
    description: Option<String>,
    #[orm(column = "priority")]
    priority: String,
    #[orm(column = "is_done")]
    is_done: bool,
    #[orm(column = "created_by")]
    created_by: Option<Uuid>,
}

#[derive(Debug, Default, Record)]
struct TodoId {
    #[orm(column = "id")]
    id: i64,
}

#[derive(Debug, Default, Record)]
struct DonePatch {
    #[orm(column = "is_done")]
    is_done: bool,
}

#[derive(Debug, Default, Record)]
struct NewLabel {
    #[orm(column = "name")]
    name: String,
    #[orm(column = "user_id")]
    user_id: Uuid,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct TodoTitle {
    #[orm(column = "id")]
    id: i64,
    #[orm(column = "title")]
    title: String,
}

const SELECT_TODO: &str = "SELECT id, title, description, priority, is_done, created_by \
                           FROM todos WHERE id = $<id> AND deleted_at IS NULL";

fn new_todo(title: &str, user_id: Uuid) -> NewTodo {
    NewTodo {
        title: title.to_string(),
        description: None,
        priority: String::new(),
        user_id,
    }
}

#[tokio::test]
async fn insert_then_read_back() -> OrmResult<()> {
    let Some(mut db) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return Ok(());
    };
    let user = Uuid::new_v4();
    db.set_actor_id(user);

    let todo = NewTodo {
        description: Some("two litres".into()),
        priority: "high".into(),
        ..new_todo("buy milk", user)
    };
    let mut inserted = TodoRow::default();
    assert!(
        db.insert_one_returning(&todo, "todos", &mut inserted, MutateOptions::default())
            .await?
    );

    let mut read = TodoRow::default();
    assert!(
        db.select_one(SELECT_TODO, &mut read, &Params::new().bind("id", inserted.id))
            .await?
    );
    assert_eq!(read, inserted);
    assert_eq!(read.title, "buy milk");
    assert_eq!(read.description.as_deref(), Some("two litres"));
    assert_eq!(read.priority, "high");
    assert_eq!(read.created_by, Some(user));
    Ok(())
}

#[tokio::test]
async fn omitted_columns_take_database_defaults() -> OrmResult<()> {
    let Some(mut db) = try_connect().await else {
        return Ok(());
    };
    let user = Uuid::new_v4();
    db.set_actor_id(user);

    let mut row = TodoRow::default();
    db.insert_one_returning(
        &new_todo("defaults", user),
        "todos",
        &mut row,
        MutateOptions::default(),
    )
    .await?;
    assert_eq!(row.priority, "medium");
    assert_eq!(row.description, None);
    Ok(())
}

#[tokio::test]
async fn select_one_cardinality() -> OrmResult<()> {
    let Some(mut db) = try_connect().await else {
        return Ok(());
    };
    let user = Uuid::new_v4();
    db.set_actor_id(user);
    let todos = vec![new_todo("a", user), new_todo("b", user)];
    db.insert_many(&todos, "todos", MutateOptions::default())
        .await?;

    let by_user = Params::new().bind("user_id", user);
    let mut dest = TodoId { id: -1 };
    let err = db
        .select_one(
            "SELECT id FROM todos WHERE user_id = $<user_id>",
            &mut dest,
            &by_user,
        )
        .await
        .unwrap_err();
    assert!(err.is_cardinality());

    let nobody = Params::new().bind("user_id", Uuid::new_v4());
    let found = db
        .select_one(
            "SELECT id FROM todos WHERE user_id = $<user_id>",
            &mut dest,
            &nobody,
        )
        .await?;
    assert!(!found);
    assert_eq!(dest.id, -1);

    let err = db
        .select_one_with(
            "SELECT id FROM todos WHERE user_id = $<user_id>",
            &mut dest,
            &nobody,
            SelectOptions::not_found("todo not found"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::NotFound(ref m) if m == "todo not found"));
    Ok(())
}

#[tokio::test]
async fn unmapped_column_is_a_mapping_error() -> OrmResult<()> {
    let Some(db) = try_connect().await else {
        return Ok(());
    };
    let err = db
        .fetch_one::<TodoId>("SELECT 1::bigint AS id, 'x' AS extra", &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Mapping { ref column, .. } if column == "extra"));
    Ok(())
}

#[tokio::test]
async fn insert_many_returning_keeps_input_order() -> OrmResult<()> {
    let Some(mut db) = try_connect().await else {
        return Ok(());
    };
    let user = Uuid::new_v4();
    db.set_actor_id(user);

    let todos = vec![
        new_todo("first", user),
        NewTodo {
            priority: "low".into(),
            ..new_todo("second", user)
        },
        new_todo("third", user),
    ];
    let mut rows: Vec<TodoRow> = vec![TodoRow::default(); 5];
    db.insert_many_returning(&todos, "todos", &mut rows, MutateOptions::default())
        .await?;

    let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["first", "second", "third"]);
    assert_eq!(rows[1].priority, "low");
    assert_eq!(rows[0].priority, "medium");
    Ok(())
}

#[tokio::test]
async fn update_and_soft_delete() -> OrmResult<()> {
    let Some(mut db) = try_connect().await else {
        return Ok(());
    };
    let user = Uuid::new_v4();
    db.set_actor_id(user);

    let mut ids: Vec<TodoId> = Vec::new();
    db.insert_many_returning(
        &[new_todo("x", user), new_todo("y", user)],
        "todos",
        &mut ids,
        MutateOptions::default(),
    )
    .await?;
    let id_list: Vec<i64> = ids.iter().map(|t| t.id).collect();

    let params = Params::new()
        .bind_list("ids", id_list.clone())
        .bind("user_id", user);
    let mut updated: Vec<TodoRow> = Vec::new();
    let n = db
        .update_returning(
            &DonePatch { is_done: true },
            "todos",
            "id IN ($<ids:list>) AND user_id = $<user_id>",
            &params,
            &mut updated,
            MutateOptions::default(),
        )
        .await?;
    assert_eq!(n, 2);
    assert!(updated.iter().all(|t| t.is_done));

    let deleted = db
        .soft_delete("todos", "id = $<id>", &Params::new().bind("id", id_list[0]))
        .await?;
    assert_eq!(deleted, 1);

    let remaining: Vec<TodoId> = db
        .fetch_all(
            "SELECT id FROM todos WHERE user_id = $<user_id> AND deleted_at IS NULL",
            &Params::new().bind("user_id", user),
        )
        .await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, id_list[1]);
    Ok(())
}

#[tokio::test]
async fn upsert_and_unique_violation() -> OrmResult<()> {
    let Some(mut db) = try_connect().await else {
        return Ok(());
    };
    let user = Uuid::new_v4();
    db.set_actor_id(user);

    let label = NewLabel {
        name: "work".into(),
        user_id: user,
    };
    db.insert_one(&label, "label_todos", MutateOptions::default())
        .await?;

    let err = db
        .insert_one(&label, "label_todos", MutateOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());

    let affected = db
        .insert_one(
            &label,
            "label_todos",
            MutateOptions::default().on_conflict("user_id, name"),
        )
        .await?;
    assert_eq!(affected, 1);
    Ok(())
}

#[tokio::test]
async fn writes_without_actor_fail_unless_opted_out() -> OrmResult<()> {
    let Some(db) = try_connect().await else {
        return Ok(());
    };
    let user = Uuid::new_v4();

    let err = db
        .insert_one(&new_todo("anon", user), "todos", MutateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::MissingActor));

    let n = db
        .insert_one(
            &new_todo("anon", user),
            "todos",
            MutateOptions::default().without_actor(),
        )
        .await?;
    assert_eq!(n, 1);
    Ok(())
}

#[tokio::test]
async fn tx_rolls_back_on_error_and_commits_on_success() -> OrmResult<()> {
    let Some(mut db) = try_connect().await else {
        return Ok(());
    };
    let user = Uuid::new_v4();
    db.set_actor_id(user);
    let count_sql = "SELECT id FROM todos WHERE user_id = $<user_id>";
    let by_user = Params::new().bind("user_id", user);

    let result: OrmResult<()> = db
        .tx(async |tx| {
            assert_eq!(tx.actor_id(), Some(user));
            tx.insert_one(&new_todo("doomed", user), "todos", MutateOptions::default())
                .await?;
            Err(OrmError::validation("abort"))
        })
        .await;
    assert!(matches!(result, Err(OrmError::Validation(_))));
    let rows: Vec<TodoId> = db.fetch_all(count_sql, &by_user).await?;
    assert!(rows.is_empty());

    let created = db
        .tx(async |tx| {
            let mut id = TodoId::default();
            tx.insert_one_returning(&new_todo("kept", user), "todos", &mut id, MutateOptions::default())
                .await?;
            tx.update(
                &DonePatch { is_done: true },
                "todos",
                "id = $<id>",
                &Params::new().bind("id", id.id),
                MutateOptions::default(),
            )
            .await?;
            Ok(id.id)
        })
        .await?;
    let rows: Vec<TodoId> = db.fetch_all(count_sql, &by_user).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, created);
    Ok(())
}

#[tokio::test]
async fn update_returning_into_single_record() -> OrmResult<()> {
    let Some(mut db) = try_connect().await else {
        return Ok(());
    };
    let user = Uuid::new_v4();
    db.set_actor_id(user);

    let mut ids: Vec<TodoId> = Vec::new();
    db.insert_many_returning(
        &[new_todo("one", user), new_todo("two", user)],
        "todos",
        &mut ids,
        MutateOptions::default(),
    )
    .await?;

    let mut dest = TodoRow {
        id: -1,
        ..TodoRow::default()
    };
    let n = db
        .update_returning(
            &DonePatch { is_done: true },
            "todos",
            "id = $<id>",
            &Params::new().bind("id", -5_i64),
            &mut dest,
            MutateOptions::default(),
        )
        .await?;
    assert_eq!(n, 0);
    assert_eq!(dest.id, -1);

    let n = db
        .update_returning(
            &DonePatch { is_done: true },
            "todos",
            "id = $<id>",
            &Params::new().bind("id", ids[0].id),
            &mut dest,
            MutateOptions::default(),
        )
        .await?;
    assert_eq!(n, 1);
    assert_eq!(dest.id, ids[0].id);
    assert_eq!(dest.title, "one");
    assert!(dest.is_done);

    let both = Params::new().bind("user_id", user);
    let err = db
        .update_returning(
            &DonePatch { is_done: false },
            "todos",
            "user_id = $<user_id>",
            &both,
            &mut dest,
            MutateOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_cardinality());
    assert!(dest.is_done);

    // The statement itself went through.
    let still_done: Vec<TodoId> = db
        .fetch_all(
            "SELECT id FROM todos WHERE user_id = $<user_id> AND is_done",
            &both,
        )
        .await?;
    assert!(still_done.is_empty());
    Ok(())
}

#[tokio::test]
async fn soft_delete_returning_collects_deleted_rows() -> OrmResult<()> {
    let Some(mut db) = try_connect().await else {
        return Ok(());
    };
    let user = Uuid::new_v4();
    db.set_actor_id(user);

    let mut ids: Vec<TodoId> = Vec::new();
    db.insert_many_returning(
        &[new_todo("a", user), new_todo("b", user), new_todo("c", user)],
        "todos",
        &mut ids,
        MutateOptions::default(),
    )
    .await?;

    let mut deleted: Vec<TodoTitle> = vec![TodoTitle::default()];
    db.soft_delete_returning(
        "todos",
        "id IN ($<ids:list>)",
        &Params::new().bind_list("ids", vec![ids[0].id, ids[2].id]),
        &mut deleted,
    )
    .await?;

    let mut titles: Vec<&str> = deleted.iter().map(|t| t.title.as_str()).collect();
    titles.sort_unstable();
    assert_eq!(titles, ["a", "c"]);

    let remaining: Vec<TodoTitle> = db
        .fetch_all(
            "SELECT id, title FROM todos WHERE user_id = $<user_id> AND deleted_at IS NULL",
            &Params::new().bind("user_id", user),
        )
        .await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].title, "b");
    Ok(())
}

#[tokio::test]
async fn failed_scan_leaves_destination_unchanged() -> OrmResult<()> {
    let Some(db) = try_connect().await else {
        return Ok(());
    };
    let keep = TodoTitle {
        id: 99,
        title: "keep".into(),
    };

    let mut one = keep.clone();
    let err = db
        .select_one(
            "SELECT 1::bigint AS id, NULL::text AS title",
            &mut one,
            &Params::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Decode { .. }), "{err:?}");
    assert_eq!(one, keep);

    let mut many = vec![keep.clone()];
    let err = db
        .select_many(
            "SELECT * FROM (VALUES (1::bigint, 'a'::text), (2::bigint, NULL::text)) \
             AS t(id, title) ORDER BY id",
            &mut many,
            &Params::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Decode { .. }), "{err:?}");
    assert_eq!(many, [keep]);
    Ok(())
}
