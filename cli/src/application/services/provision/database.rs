//! Stage 5: database and application user.

use anyhow::Result;

use super::{ProvisioningState, StageCtx};
use crate::application::ports::RemoteShell;
use crate::application::services::executor::run_checked;
use crate::application::services::step::StageReport;
use crate::domain::shell::mysql_script;

/// SQL creating the database and its user, granting the user full rights on
/// that database only.
///
/// Re-running it resets the user's password, so the credentials written to
/// `wp-config.php` on this run are the ones MySQL accepts.
#[must_use]
pub fn provisioning_sql(db_name: &str, db_user: &str, password: &str) -> String {
    format!(
        "CREATE DATABASE IF NOT EXISTS `{db_name}` DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;\n\
         CREATE USER IF NOT EXISTS '{db_user}'@'localhost' IDENTIFIED BY '{password}';\n\
         ALTER USER '{db_user}'@'localhost' IDENTIFIED BY '{password}';\n\
         GRANT ALL PRIVILEGES ON `{db_name}`.* TO '{db_user}'@'localhost';\n\
         FLUSH PRIVILEGES;"
    )
}

pub async fn provision<R: RemoteShell, D>(
    ctx: &StageCtx<'_, R, D>,
    state: &ProvisioningState,
) -> Result<StageReport> {
    let sql = provisioning_sql(&state.db_name, &state.db_user, state.db_password.expose());
    run_checked(
        ctx.shell,
        "creating database and user",
        &mysql_script(&sql)?,
        ctx.config.timeouts.default_cmd(),
    )
    .await?;
    Ok(StageReport::done(format!(
        "Database {} ready for user {}",
        state.db_name, state.db_user
    )))
}
