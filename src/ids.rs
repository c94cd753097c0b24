use once_cell::sync::OnceCell;
use uuid::Uuid;

static BATCH_RUN_ID: OnceCell<String> = OnceCell::new();

fn generate(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

pub fn thread_id() -> String {
    generate("thread")
}

pub fn scenario_id() -> String {
    generate("scenario")
}

pub fn scenario_run_id() -> String {
    generate("scenario_run")
}

/// A configured id is used as is; otherwise every run in this process shares
/// one generated id.
pub fn batch_run_id(configured: Option<&str>) -> String {
    match configured {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => BATCH_RUN_ID
            .get_or_init(|| generate("scenario_batch_run"))
            .clone(),
    }
}
