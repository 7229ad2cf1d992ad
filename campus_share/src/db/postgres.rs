//! PostgreSQL implementation of the repository traits.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::{
    StoreError, StoreResult,
    repository::{CommentRepository, MessageRepository, ResourceRepository, UserRepository},
};
use crate::{
    auth::{Credentials, IdentityKeys, NewUser, Role, User, UserId},
    comments::Comment,
    messages::{Category, Message, MessageId},
    resources::{Resource, ResourceFilter, ResourceId},
};

const USER_COLUMNS: &str = "id, email, username, full_name, student_id, phone, is_hosteller, \
     hostel, degree, branch, department, year, consent_for_contact, role, created_at";

const RESOURCE_COLUMNS: &str =
    "id, title, description, subject, year, file_url, stored_file, uploaded_by, downloads, tags, created_at";

const MESSAGE_COLUMNS: &str =
    "id, category, text, media_url, media_type, sender, reply_to, consent_for_contact, created_at";

/// Store over a PostgreSQL pool
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate a unique violation into [`StoreError::Conflict`] naming the column.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let constraint = db.constraint().unwrap_or_default();
            let field = ["email", "username", "student_id", "phone"]
                .into_iter()
                .find(|field| constraint.contains(field))
                .unwrap_or("value");
            return StoreError::Conflict(field.to_string());
        }
    }
    StoreError::Database(err)
}

/// Escape LIKE metacharacters so user input matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        full_name: row.try_get("full_name")?,
        student_id: row.try_get("student_id")?,
        phone: row.try_get("phone")?,
        is_hosteller: row.try_get("is_hosteller")?,
        hostel: row.try_get("hostel")?,
        degree: row.try_get("degree")?,
        branch: row.try_get("branch")?,
        department: row.try_get("department")?,
        year: row.try_get("year")?,
        consent_for_contact: row.try_get("consent_for_contact")?,
        role: Role::parse(&role).ok_or_else(|| StoreError::Corrupt(format!("role {role}")))?,
        created_at: row.try_get("created_at")?,
    })
}

fn resource_from_row(row: &PgRow) -> StoreResult<Resource> {
    Ok(Resource {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        subject: row.try_get("subject")?,
        year: row.try_get("year")?,
        file_url: row.try_get("file_url")?,
        stored_file: row.try_get("stored_file")?,
        uploaded_by: row.try_get("uploaded_by")?,
        downloads: row.try_get("downloads")?,
        tags: row.try_get("tags")?,
        created_at: row.try_get("created_at")?,
    })
}

fn comment_from_row(row: &PgRow) -> StoreResult<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        resource_id: row.try_get("resource_id")?,
        user_id: row.try_get("user_id")?,
        comment: row.try_get("comment")?,
        created_at: row.try_get("created_at")?,
    })
}

fn message_from_row(row: &PgRow) -> StoreResult<Message> {
    let category: String = row.try_get("category")?;
    Ok(Message {
        id: row.try_get("id")?,
        category: category
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("category {category}")))?,
        text: row.try_get("text")?,
        media_url: row.try_get("media_url")?,
        media_type: row.try_get("media_type")?,
        sender: row.try_get("sender")?,
        reply_to: row.try_get("reply_to")?,
        consent_for_contact: row.try_get("consent_for_contact")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_conflict(
        &self,
        keys: &IdentityKeys,
        exclude: Option<UserId>,
    ) -> StoreResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE (email = $1 OR username = $2 OR student_id = $3 OR phone = $4)
               AND ($5::uuid IS NULL OR id <> $5)
             LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(&keys.email)
            .bind(&keys.username)
            .bind(&keys.student_id)
            .bind(&keys.phone)
            .bind(exclude)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (id, email, username, password_hash, full_name, student_id, phone,
                                is_hosteller, hostel, degree, branch, department, year,
                                consent_for_contact, role, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.full_name)
            .bind(&user.student_id)
            .bind(&user.phone)
            .bind(user.is_hosteller)
            .bind(&user.hostel)
            .bind(&user.degree)
            .bind(&user.branch)
            .bind(&user.department)
            .bind(user.year)
            .bind(user.consent_for_contact)
            .bind(Role::Student.as_str())
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;

        user_from_row(&row)
    }

    async fn find_by_identifier(&self, identifier: &str) -> StoreResult<Option<Credentials>> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users
             WHERE email = $1 OR username = $2 OR student_id = $2 OR phone = $2
             ORDER BY (email = $1) DESC
             LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(identifier.to_lowercase())
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Credentials {
                user: user_from_row(&row)?,
                password_hash: row.try_get("password_hash")?,
            })),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_users(&self, user_ids: &[UserId]) -> StoreResult<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        let rows = sqlx::query(&sql)
            .bind(user_ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "UPDATE users SET full_name = $2, student_id = $3, phone = $4, is_hosteller = $5,
                              hostel = $6, degree = $7, branch = $8, department = $9,
                              year = $10, consent_for_contact = $11
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.student_id)
        .bind(&user.phone)
        .bind(user.is_hosteller)
        .bind(&user.hostel)
        .bind(&user.degree)
        .bind(&user.branch)
        .bind(&user.department)
        .bind(user.year)
        .bind(user.consent_for_contact)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }
}

#[async_trait]
impl ResourceRepository for PgStore {
    async fn insert_resource(&self, resource: &Resource) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO resources (id, title, description, subject, year, file_url,
                                    stored_file, uploaded_by, downloads, tags, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(resource.id)
        .bind(&resource.title)
        .bind(&resource.description)
        .bind(&resource.subject)
        .bind(resource.year)
        .bind(&resource.file_url)
        .bind(resource.stored_file)
        .bind(resource.uploaded_by)
        .bind(resource.downloads)
        .bind(&resource.tags)
        .bind(resource.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_resource(&self, id: ResourceId) -> StoreResult<Option<Resource>> {
        let sql = format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        row.as_ref().map(resource_from_row).transpose()
    }

    async fn list_resources(&self, offset: i64, limit: i64) -> StoreResult<Vec<Resource>> {
        let sql = format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources
             ORDER BY created_at DESC
             OFFSET $1 LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(resource_from_row).collect()
    }

    async fn count_resources(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resources")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn search_resources(&self, filter: &ResourceFilter) -> StoreResult<Vec<Resource>> {
        let sql = format!(
            r"SELECT {RESOURCE_COLUMNS} FROM resources
             WHERE ($1::text IS NULL
                    OR title ILIKE $1 ESCAPE '\'
                    OR description ILIKE $1 ESCAPE '\'
                    OR subject ILIKE $1 ESCAPE '\')
               AND ($2::text IS NULL OR subject = $2)
               AND ($3::int IS NULL OR year = $3)
               AND ($4::uuid IS NULL OR uploaded_by = $4)
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.query.as_deref().map(like_pattern))
            .bind(&filter.subject)
            .bind(filter.year)
            .bind(filter.uploaded_by)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(resource_from_row).collect()
    }

    async fn increment_downloads(&self, id: ResourceId) -> StoreResult<Option<Resource>> {
        let sql = format!(
            "UPDATE resources SET downloads = downloads + 1
             WHERE id = $1
             RETURNING {RESOURCE_COLUMNS}"
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        row.as_ref().map(resource_from_row).transpose()
    }

    async fn update_resource(&self, resource: &Resource) -> StoreResult<()> {
        sqlx::query(
            "UPDATE resources SET title = $2, description = $3, subject = $4, year = $5, tags = $6
             WHERE id = $1",
        )
        .bind(resource.id)
        .bind(&resource.title)
        .bind(&resource.description)
        .bind(&resource.subject)
        .bind(resource.year)
        .bind(&resource.tags)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_resource(&self, id: ResourceId) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comments WHERE resource_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CommentRepository for PgStore {
    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO comments (id, resource_id, user_id, comment, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(comment.id)
        .bind(comment.resource_id)
        .bind(comment.user_id)
        .bind(&comment.comment)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_comments(&self, resource_id: ResourceId) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT id, resource_id, user_id, comment, created_at FROM comments
             WHERE resource_id = $1
             ORDER BY created_at DESC",
        )
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(comment_from_row).collect()
    }
}

#[async_trait]
impl MessageRepository for PgStore {
    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO messages (id, category, text, media_url, media_type, sender,
                                   reply_to, consent_for_contact, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(message.id)
        .bind(message.category.as_str())
        .bind(&message.text)
        .bind(&message.media_url)
        .bind(&message.media_type)
        .bind(message.sender)
        .bind(message.reply_to)
        .bind(message.consent_for_contact)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_message(&self, id: MessageId) -> StoreResult<Option<Message>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        row.as_ref().map(message_from_row).transpose()
    }

    async fn find_messages(&self, ids: &[MessageId]) -> StoreResult<Vec<Message>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ANY($1)");
        let rows = sqlx::query(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn list_messages(
        &self,
        category: Category,
        offset: i64,
        limit: i64,
    ) -> StoreResult<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE category = $1
             ORDER BY created_at DESC
             OFFSET $2 LIMIT $3"
        );
        let rows = sqlx::query(&sql)
            .bind(category.as_str())
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn count_messages(&self, category: Category) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE category = $1")
            .bind(category.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_message(&self, id: MessageId) -> StoreResult<bool> {
        // reply_to is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("graph"), "%graph%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\"), "%c:\\\\%");
    }
}
