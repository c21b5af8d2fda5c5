use std::sync::Arc;

use crate::error::Result;
use crate::index::build_index;
use crate::server::serve;
use crate::settings::load_settings;

pub fn run(bind: Option<String>) -> Result<()> {
    let settings = load_settings();
    settings.validate()?;
    let bind = bind.unwrap_or_else(|| settings.bind.clone());

    let index = Arc::new(build_index(&settings));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(&bind, index))
}
