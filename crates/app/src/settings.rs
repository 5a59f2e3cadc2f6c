use config::{Config, Environment, File};
use kizashi_core::config::AppConfig;
use std::error::Error;
use std::path::Path;

/// 默认配置文件位置，可通过 `KIZASHI_CONFIG` 覆盖
pub const DEFAULT_CONFIG_PATH: &str = "config/kizashi.toml";

/// # Summary
/// 加载并校验应用配置。
///
/// # Logic
/// 1. 以 `AppConfig` 的 serde 默认值为底。
/// 2. 叠加可选的 TOML 文件。
/// 3. 叠加环境变量 `KIZASHI__SECTION__KEY`，例如 `KIZASHI__SCANNER__HTF=2h`。
/// 4. 调用 `AppConfig::validate()`，非法组合直接拒绝启动。
pub fn load_config(path: &Path) -> Result<AppConfig, Box<dyn Error>> {
    let settings = Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix("KIZASHI")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let cfg: AppConfig = settings.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}
