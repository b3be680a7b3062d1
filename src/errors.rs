use std::fmt;

#[derive(Debug, Clone)]
pub enum IpLocatorError {
    Configuration(String),
    BackendUnavailable(String),
    Source(String),
    Validation(String),
    FileOperation(String),
    Serialization(String),
}

impl IpLocatorError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            IpLocatorError::Configuration(_) => "E001",
            IpLocatorError::BackendUnavailable(_) => "E002",
            IpLocatorError::Source(_) => "E003",
            IpLocatorError::Validation(_) => "E004",
            IpLocatorError::FileOperation(_) => "E005",
            IpLocatorError::Serialization(_) => "E006",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            IpLocatorError::Configuration(_) => "Configuration Error",
            IpLocatorError::BackendUnavailable(_) => "Backend Unavailable",
            IpLocatorError::Source(_) => "Lookup Source Error",
            IpLocatorError::Validation(_) => "Validation Error",
            IpLocatorError::FileOperation(_) => "File Operation Error",
            IpLocatorError::Serialization(_) => "Serialization Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            IpLocatorError::Configuration(msg) => msg,
            IpLocatorError::BackendUnavailable(msg) => msg,
            IpLocatorError::Source(msg) => msg,
            IpLocatorError::Validation(msg) => msg,
            IpLocatorError::FileOperation(msg) => msg,
            IpLocatorError::Serialization(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于启动失败时打印到终端）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }

    /// 启动阶段出现即应终止进程的错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IpLocatorError::Configuration(_) | IpLocatorError::BackendUnavailable(_)
        )
    }
}

impl fmt::Display for IpLocatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for IpLocatorError {}

// 便捷的构造函数
impl IpLocatorError {
    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        IpLocatorError::Configuration(msg.into())
    }

    pub fn backend_unavailable<T: Into<String>>(msg: T) -> Self {
        IpLocatorError::BackendUnavailable(msg.into())
    }

    pub fn lookup_source<T: Into<String>>(msg: T) -> Self {
        IpLocatorError::Source(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        IpLocatorError::Validation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        IpLocatorError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        IpLocatorError::Serialization(msg.into())
    }
}

impl From<std::io::Error> for IpLocatorError {
    fn from(err: std::io::Error) -> Self {
        IpLocatorError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for IpLocatorError {
    fn from(err: serde_json::Error) -> Self {
        IpLocatorError::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for IpLocatorError {
    fn from(err: redis::RedisError) -> Self {
        IpLocatorError::BackendUnavailable(err.to_string())
    }
}

impl From<config::ConfigError> for IpLocatorError {
    fn from(err: config::ConfigError) -> Self {
        IpLocatorError::Configuration(err.to_string())
    }
}

#[cfg(feature = "maxmind")]
impl From<maxminddb::MaxMindDbError> for IpLocatorError {
    fn from(err: maxminddb::MaxMindDbError) -> Self {
        IpLocatorError::Source(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IpLocatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(IpLocatorError::configuration("x").code(), "E001");
        assert_eq!(IpLocatorError::backend_unavailable("x").code(), "E002");
        assert_eq!(IpLocatorError::lookup_source("x").code(), "E003");
        assert_eq!(IpLocatorError::serialization("x").code(), "E006");
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = IpLocatorError::configuration("cache capacity must be positive");
        assert_eq!(
            err.to_string(),
            "Configuration Error: cache capacity must be positive"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(IpLocatorError::configuration("bad kind").is_fatal());
        assert!(IpLocatorError::backend_unavailable("refused").is_fatal());
        assert!(!IpLocatorError::lookup_source("timeout").is_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: IpLocatorError = io.into();
        assert!(matches!(err, IpLocatorError::FileOperation(_)));
    }
}
