/// 程序配置
///
/// 环境变量覆盖默认值；API Key 不在这里兜底，统一走
/// `SettingsStore`（本地设置优先，环境变量其次，两者皆无报配置错误）。
#[derive(Clone, Debug)]
pub struct Config {
    /// 分析服务（OpenAI 兼容端点）地址
    pub llm_api_base_url: String,
    /// 分析服务模型名
    pub llm_model_name: String,
    /// 环境变量提供的默认 API Key（可为空）
    pub default_api_key: Option<String>,
    /// 本地设置文件路径（持久化键值存储）
    pub settings_file: String,
    /// 导出 PDF 的输出目录
    pub output_folder: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai"
                .to_string(),
            llm_model_name: "gemini-3-pro-preview".to_string(),
            default_api_key: None,
            settings_file: "settings.toml".to_string(),
            output_folder: ".".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            default_api_key: std::env::var("GEMINI_API_KEY").ok(),
            settings_file: std::env::var("SETTINGS_FILE").unwrap_or(default.settings_file),
            output_folder: std::env::var("OUTPUT_FOLDER").unwrap_or(default.output_folder),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }
}
