use std::fmt;

/// 应用程序错误类型
///
/// 四类核心错误（提取 / 组装 / 配置 / 导出）各自对应一次用户操作的
/// 终态失败：不自动重试，向用户展示一条信息，保留已有状态。
#[derive(Debug)]
pub enum AppError {
    /// 文件内容提取错误
    Extraction(ExtractionError),
    /// 分析请求组装 / 响应解析错误
    Assembly(AssemblyError),
    /// 配置错误（缺少 API Key 等）
    Config(ConfigError),
    /// 报告导出错误
    Export(ExportError),
    /// 字段路径解析 / 应用错误
    Path(PathError),
    /// 流程前置校验错误（未进入流水线）
    Validation(String),
    /// 文件操作错误
    File(FileError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Extraction(e) => write!(f, "提取错误: {}", e),
            AppError::Assembly(e) => write!(f, "组装错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Export(e) => write!(f, "导出错误: {}", e),
            AppError::Path(e) => write!(f, "路径错误: {}", e),
            AppError::Validation(msg) => write!(f, "校验错误: {}", msg),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Extraction(e) => Some(e),
            AppError::Assembly(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Export(e) => Some(e),
            AppError::Path(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Validation(_) | AppError::Other(_) => None,
        }
    }
}

/// 文件内容提取错误
///
/// 提取失败不返回部分结果：要么完整的 text / binary，要么错误。
#[derive(Debug)]
pub enum ExtractionError {
    /// 读取字节流失败
    ReadFailed {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// DOCX 解析失败
    DocxParseFailed {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 工作簿（xlsx/xls）解析失败
    WorkbookParseFailed {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionError::ReadFailed { name, source } => {
                write!(f, "读取文件失败 ({}): {}", name, source)
            }
            ExtractionError::DocxParseFailed { name, source } => {
                write!(f, "DOCX 解析失败 ({}): {}", name, source)
            }
            ExtractionError::WorkbookParseFailed { name, source } => {
                write!(f, "工作簿解析失败 ({}): {}", name, source)
            }
        }
    }
}

impl std::error::Error for ExtractionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractionError::ReadFailed { source, .. }
            | ExtractionError::DocxParseFailed { source, .. }
            | ExtractionError::WorkbookParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 分析请求组装 / 响应解析错误
#[derive(Debug)]
pub enum AssemblyError {
    /// 分析服务调用失败
    ApiCallFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 分析服务返回空内容
    EmptyResponse {
        model: String,
    },
    /// 返回内容无法按报告 schema 解析
    JsonParseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回内容形状合法但违反报告约束
    SchemaViolation {
        reason: String,
    },
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyError::ApiCallFailed { model, source } => {
                write!(f, "分析服务调用失败 (模型: {}): {}", model, source)
            }
            AssemblyError::EmptyResponse { model } => {
                write!(f, "分析服务返回空内容 (模型: {})", model)
            }
            AssemblyError::JsonParseFailed { source } => {
                write!(f, "报告 JSON 解析失败: {}", source)
            }
            AssemblyError::SchemaViolation { reason } => {
                write!(f, "报告内容违反约束: {}", reason)
            }
        }
    }
}

impl std::error::Error for AssemblyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssemblyError::ApiCallFailed { source, .. }
            | AssemblyError::JsonParseFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 既没有本地保存的 Key，也没有环境变量兜底
    MissingApiKey,
    /// 设置文件读取失败
    SettingsReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 设置文件写入失败
    SettingsWriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 设置文件解析失败
    SettingsParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingApiKey => {
                write!(
                    f,
                    "未配置 API Key：请在设置中填写，或设置 GEMINI_API_KEY 环境变量"
                )
            }
            ConfigError::SettingsReadFailed { path, source } => {
                write!(f, "读取设置文件失败 ({}): {}", path, source)
            }
            ConfigError::SettingsWriteFailed { path, source } => {
                write!(f, "写入设置文件失败 ({}): {}", path, source)
            }
            ConfigError::SettingsParseFailed { path, source } => {
                write!(f, "解析设置文件失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::SettingsReadFailed { source, .. }
            | ConfigError::SettingsWriteFailed { source, .. }
            | ConfigError::SettingsParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            ConfigError::MissingApiKey => None,
        }
    }
}

/// 报告导出错误
///
/// 任一步骤失败都会使导出状态机进入 Failed，不落盘任何部分产物。
#[derive(Debug)]
pub enum ExportError {
    /// 加载渲染内容失败
    LoadFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 数学排版失败
    TypesetFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 页面快照（打印 PDF）失败
    SnapshotFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 产物写盘失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::LoadFailed { source } => write!(f, "加载渲染内容失败: {}", source),
            ExportError::TypesetFailed { source } => write!(f, "数学排版失败: {}", source),
            ExportError::SnapshotFailed { source } => write!(f, "页面快照失败: {}", source),
            ExportError::WriteFailed { path, source } => {
                write!(f, "写入导出文件失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::LoadFailed { source }
            | ExportError::TypesetFailed { source }
            | ExportError::SnapshotFailed { source }
            | ExportError::WriteFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 字段路径错误
///
/// 路径必须严格落在现有结构上：未知字段、越界索引、指向非叶子节点
/// 都是调用方的前置条件违约，立即失败，绝不静默跳过或自动扩容。
#[derive(Debug)]
pub enum PathError {
    /// 空路径
    EmptyPath,
    /// 字段不存在
    UnknownField {
        field: String,
    },
    /// 数组索引越界
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
    /// 段类型与节点不匹配（对象上用索引 / 数组上用字段名 / 标量下继续走）
    SegmentMismatch {
        segment: String,
    },
    /// 目标不是标量叶子
    NotALeaf {
        path: String,
    },
    /// 新值类型与 schema 不符
    TypeMismatch {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::EmptyPath => write!(f, "字段路径不能为空"),
            PathError::UnknownField { field } => write!(f, "字段不存在: {}", field),
            PathError::IndexOutOfRange { index, len } => {
                write!(f, "索引 {} 超出范围 [0, {})", index, len)
            }
            PathError::SegmentMismatch { segment } => {
                write!(f, "路径段与节点类型不匹配: {}", segment)
            }
            PathError::NotALeaf { path } => {
                write!(f, "路径 {} 指向的不是标量叶子节点", path)
            }
            PathError::TypeMismatch { source } => {
                write!(f, "新值类型与报告 schema 不符: {}", source)
            }
        }
    }
}

impl std::error::Error for PathError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PathError::TypeMismatch { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 文件不存在
    NotFound {
        path: String,
    },
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::NotFound { path } => write!(f, "文件不存在: {}", path),
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            FileError::NotFound { .. } => None,
        }
    }
}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<PathError> for AppError {
    fn from(err: PathError) -> Self {
        AppError::Path(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取失败的提取错误
    pub fn extraction_read_failed(
        name: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Extraction(ExtractionError::ReadFailed {
            name: name.into(),
            source: Box::new(source),
        })
    }

    /// 创建分析服务调用失败错误
    pub fn assembly_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Assembly(AssemblyError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 创建报告约束违反错误
    pub fn schema_violation(reason: impl Into<String>) -> Self {
        AppError::Assembly(AssemblyError::SchemaViolation {
            reason: reason.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = std::result::Result<T, AppError>;
