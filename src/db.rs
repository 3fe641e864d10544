use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CreateTask, Task, UpdateTask, User};

pub type DbPool = Arc<Mutex<Connection>>;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        created_at INTEGER DEFAULT (strftime('%s', 'now'))
    );

    CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        completed INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER DEFAULT (strftime('%s', 'now')),
        updated_at INTEGER DEFAULT (strftime('%s', 'now'))
    );

    CREATE INDEX IF NOT EXISTS tasks_user_id ON tasks (user_id);
";

const TASK_COLUMNS: &str = "id, user_id, title, completed, created_at, updated_at";

/// Opens (or creates) the store at `path`. `:memory:` gives a private
/// in-memory database.
pub fn init_db(path: &str) -> Result<DbPool, AppError> {
    let conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub fn init_memory_db() -> Result<DbPool, AppError> {
    init_db(":memory:")
}

fn lock(pool: &DbPool) -> Result<MutexGuard<'_, Connection>, AppError> {
    pool.lock()
        .map_err(|_| AppError::Internal("database lock poisoned".to_string()))
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        completed: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

// User operations
pub fn create_user(pool: &DbPool, username: &str, password_hash: &str) -> Result<User, AppError> {
    let conn = lock(pool)?;
    let id = Uuid::new_v4().to_string();

    match conn.execute(
        "INSERT INTO users (id, username, password_hash) VALUES (?1, ?2, ?3)",
        (&id, username, password_hash),
    ) {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            return Err(AppError::Conflict("Username already taken"));
        }
        Err(err) => return Err(err.into()),
    }

    let user = conn.query_row(
        "SELECT id, username, password_hash, created_at FROM users WHERE id = ?1",
        [&id],
        row_to_user,
    )?;
    Ok(user)
}

pub fn get_user_by_username(pool: &DbPool, username: &str) -> Result<Option<User>, AppError> {
    let conn = lock(pool)?;
    let user = conn
        .query_row(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
            [username],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

// Task operations
pub fn list_tasks(pool: &DbPool, user_id: &str) -> Result<Vec<Task>, AppError> {
    let conn = lock(pool)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 ORDER BY created_at ASC, rowid ASC"
    ))?;
    let tasks = stmt
        .query_map([user_id], row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

pub fn create_task(pool: &DbPool, user_id: &str, new: &CreateTask) -> Result<Task, AppError> {
    let conn = lock(pool)?;
    let id = Uuid::new_v4().to_string();

    match conn.execute(
        "INSERT INTO tasks (id, user_id, title, completed) VALUES (?1, ?2, ?3, ?4)",
        (&id, user_id, &new.title, new.completed.unwrap_or(false)),
    ) {
        Ok(_) => {}
        // Owner row is gone; the token outlived its user.
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            warn!(%user_id, "Task owner does not exist");
            return Err(AppError::Unauthorized);
        }
        Err(err) => return Err(err.into()),
    }

    get_task_internal(&conn, user_id, &id)?
        .ok_or_else(|| AppError::Internal(format!("inserted task {id} vanished")))
}

/// Merges `changes` into the caller's task. `None` when the task does not
/// exist or belongs to someone else.
pub fn update_task(
    pool: &DbPool,
    user_id: &str,
    id: &str,
    changes: &UpdateTask,
) -> Result<Option<Task>, AppError> {
    let conn = lock(pool)?;

    let mut updates = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(title) = &changes.title {
        updates.push("title = ?");
        params.push(Box::new(title.clone()));
    }
    if let Some(completed) = changes.completed {
        updates.push("completed = ?");
        params.push(Box::new(completed));
    }

    if updates.is_empty() {
        return get_task_internal(&conn, user_id, id);
    }

    updates.push("updated_at = strftime('%s', 'now')");
    params.push(Box::new(id.to_string()));
    params.push(Box::new(user_id.to_string()));

    let query = format!(
        "UPDATE tasks SET {} WHERE id = ? AND user_id = ?",
        updates.join(", ")
    );

    let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    if conn.execute(&query, params_refs.as_slice())? == 0 {
        return Ok(None);
    }

    get_task_internal(&conn, user_id, id)
}

/// Returns whether a row was removed. Missing or foreign tasks are left alone.
pub fn delete_task(pool: &DbPool, user_id: &str, id: &str) -> Result<bool, AppError> {
    let conn = lock(pool)?;
    let rows = conn.execute(
        "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
        [id, user_id],
    )?;
    Ok(rows > 0)
}

fn get_task_internal(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Task>, AppError> {
    let task = conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2"),
            [id, user_id],
            row_to_task,
        )
        .optional()?;
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_task(title: &str) -> CreateTask {
        CreateTask {
            title: title.to_string(),
            completed: None,
        }
    }

    #[test]
    fn duplicate_username_is_a_conflict() {
        let db = init_memory_db().unwrap();
        create_user(&db, "alice", "hash").unwrap();

        let err = create_user(&db, "alice", "other").unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn lookup_by_username() {
        let db = init_memory_db().unwrap();
        let created = create_user(&db, "alice", "hash").unwrap();

        let found = get_user_by_username(&db, "alice").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.password_hash, "hash");
        assert!(get_user_by_username(&db, "bob").unwrap().is_none());
    }

    #[test]
    fn list_is_scoped_to_owner() {
        let db = init_memory_db().unwrap();
        let alice = create_user(&db, "alice", "h").unwrap();
        let bob = create_user(&db, "bob", "h").unwrap();

        create_task(&db, &alice.id, &new_task("a1")).unwrap();
        create_task(&db, &alice.id, &new_task("a2")).unwrap();
        create_task(&db, &bob.id, &new_task("b1")).unwrap();

        let tasks = list_tasks(&db, &alice.id).unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.user_id == alice.id));
        assert_eq!(tasks[0].title, "a1");
        assert_eq!(tasks[1].title, "a2");
    }

    #[test]
    fn created_task_defaults_to_open() {
        let db = init_memory_db().unwrap();
        let alice = create_user(&db, "alice", "h").unwrap();

        let task = create_task(&db, &alice.id, &new_task("Buy milk")).unwrap();
        assert!(!task.completed);
        assert!(!task.id.is_empty());

        let listed = list_tasks(&db, &alice.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, task.id);
        assert!(!listed[0].completed);
    }

    #[test]
    fn update_merges_present_fields() {
        let db = init_memory_db().unwrap();
        let alice = create_user(&db, "alice", "h").unwrap();
        let task = create_task(&db, &alice.id, &new_task("Buy milk")).unwrap();

        let changes = UpdateTask {
            completed: Some(true),
            ..Default::default()
        };
        let updated = update_task(&db, &alice.id, &task.id, &changes)
            .unwrap()
            .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.title, "Buy milk");

        let unchanged = update_task(&db, &alice.id, &task.id, &UpdateTask::default())
            .unwrap()
            .unwrap();
        assert!(unchanged.completed);
    }

    #[test]
    fn update_of_missing_or_foreign_task_is_none() {
        let db = init_memory_db().unwrap();
        let alice = create_user(&db, "alice", "h").unwrap();
        let bob = create_user(&db, "bob", "h").unwrap();
        let task = create_task(&db, &alice.id, &new_task("mine")).unwrap();

        let changes = UpdateTask {
            title: Some("stolen".to_string()),
            ..Default::default()
        };
        assert!(update_task(&db, &alice.id, "missing", &changes)
            .unwrap()
            .is_none());
        assert!(update_task(&db, &bob.id, &task.id, &changes)
            .unwrap()
            .is_none());

        let tasks = list_tasks(&db, &alice.id).unwrap();
        assert_eq!(tasks[0].title, "mine");
    }

    #[test]
    fn delete_is_idempotent_and_owner_scoped() {
        let db = init_memory_db().unwrap();
        let alice = create_user(&db, "alice", "h").unwrap();
        let bob = create_user(&db, "bob", "h").unwrap();
        let task = create_task(&db, &alice.id, &new_task("mine")).unwrap();

        assert!(!delete_task(&db, &bob.id, &task.id).unwrap());
        assert_eq!(list_tasks(&db, &alice.id).unwrap().len(), 1);

        assert!(delete_task(&db, &alice.id, &task.id).unwrap());
        assert!(!delete_task(&db, &alice.id, &task.id).unwrap());
        assert!(list_tasks(&db, &alice.id).unwrap().is_empty());
    }

    #[test]
    fn tasks_require_an_existing_owner() {
        let db = init_memory_db().unwrap();
        let err = create_task(&db, "nobody", &new_task("orphan")).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }
}
