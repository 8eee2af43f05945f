use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{
    EngineError, ResultEngine, users,
    util::{normalize_optional_text, normalize_required},
};

use super::{Engine, with_tx};

impl Engine {
    /// Registers a user in the directory expenses are resolved against.
    pub async fn create_user(&self, username: &str, display_name: Option<&str>) -> ResultEngine<()> {
        let username = normalize_required(username, "username")?;
        let display_name = normalize_optional_text(display_name);
        with_tx!(self, |db_tx| {
            if users::Entity::find_by_id(username.clone())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(username));
            }
            users::ActiveModel {
                username: ActiveValue::Set(username.clone()),
                display_name: ActiveValue::Set(display_name),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!(%username, "user created");
            Ok(())
        })
    }

    /// Display name of a user, falling back to the username.
    pub async fn display_name(&self, username: &str) -> ResultEngine<String> {
        let user = self.require_user(&self.database, username).await?;
        Ok(user.display_name.unwrap_or(user.username))
    }
}
