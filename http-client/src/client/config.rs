use std::time::Duration;

const DEFAULT_MAX_REDIRECTS: usize = 50;
const DEFAULT_MAX_AUTH_ATTEMPTS: usize = 3;
const DEFAULT_WAIT_FOR_CONTINUE: Duration = Duration::from_secs(3);

/// 请求执行器配置
#[derive(Debug, Clone)]
pub struct DirectorConfig {
    handle_redirects: bool,
    max_redirects: usize,
    handle_authentication: bool,
    max_auth_attempts: usize,
    stale_connection_check: bool,
    lease_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    socket_timeout: Option<Duration>,
    wait_for_continue: Duration,
}

impl Default for DirectorConfig {
    #[inline]
    fn default() -> Self {
        Self {
            handle_redirects: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            handle_authentication: true,
            max_auth_attempts: DEFAULT_MAX_AUTH_ATTEMPTS,
            stale_connection_check: true,
            lease_timeout: None,
            connect_timeout: None,
            socket_timeout: None,
            wait_for_continue: DEFAULT_WAIT_FOR_CONTINUE,
        }
    }
}

impl DirectorConfig {
    /// 创建请求执行器配置构建器
    #[inline]
    pub fn builder() -> DirectorConfigBuilder {
        Default::default()
    }

    /// 是否自动处理重定向
    #[inline]
    pub fn handle_redirects(&self) -> bool {
        self.handle_redirects
    }

    /// 最大重定向次数
    #[inline]
    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// 是否自动处理鉴权质询
    #[inline]
    pub fn handle_authentication(&self) -> bool {
        self.handle_authentication
    }

    /// 单次请求执行中，对同一目标主机或代理的最大鉴权轮数
    #[inline]
    pub fn max_auth_attempts(&self) -> usize {
        self.max_auth_attempts
    }

    /// 复用连接前是否检查连接已经失效
    #[inline]
    pub fn stale_connection_check(&self) -> bool {
        self.stale_connection_check
    }

    /// 等待连接管理器分配连接的超时时长
    #[inline]
    pub fn lease_timeout(&self) -> Option<Duration> {
        self.lease_timeout
    }

    /// 建立连接的超时时长
    #[inline]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// 读取响应的超时时长
    #[inline]
    pub fn socket_timeout(&self) -> Option<Duration> {
        self.socket_timeout
    }

    /// 发送 `Expect: 100-continue` 后等待服务器响应的时长
    #[inline]
    pub fn wait_for_continue(&self) -> Duration {
        self.wait_for_continue
    }
}

/// 请求执行器配置构建器
#[derive(Debug, Clone, Default)]
pub struct DirectorConfigBuilder {
    inner: DirectorConfig,
}

impl DirectorConfigBuilder {
    /// 设置是否自动处理重定向
    #[inline]
    pub fn handle_redirects(&mut self, handle_redirects: bool) -> &mut Self {
        self.inner.handle_redirects = handle_redirects;
        self
    }

    /// 设置最大重定向次数
    #[inline]
    pub fn max_redirects(&mut self, max_redirects: usize) -> &mut Self {
        self.inner.max_redirects = max_redirects;
        self
    }

    /// 设置是否自动处理鉴权质询
    #[inline]
    pub fn handle_authentication(&mut self, handle_authentication: bool) -> &mut Self {
        self.inner.handle_authentication = handle_authentication;
        self
    }

    /// 设置最大鉴权轮数
    #[inline]
    pub fn max_auth_attempts(&mut self, max_auth_attempts: usize) -> &mut Self {
        self.inner.max_auth_attempts = max_auth_attempts;
        self
    }

    /// 设置复用连接前是否检查连接已经失效
    #[inline]
    pub fn stale_connection_check(&mut self, stale_connection_check: bool) -> &mut Self {
        self.inner.stale_connection_check = stale_connection_check;
        self
    }

    /// 设置等待连接管理器分配连接的超时时长
    #[inline]
    pub fn lease_timeout(&mut self, lease_timeout: Duration) -> &mut Self {
        self.inner.lease_timeout = Some(lease_timeout);
        self
    }

    /// 设置建立连接的超时时长
    #[inline]
    pub fn connect_timeout(&mut self, connect_timeout: Duration) -> &mut Self {
        self.inner.connect_timeout = Some(connect_timeout);
        self
    }

    /// 设置读取响应的超时时长
    #[inline]
    pub fn socket_timeout(&mut self, socket_timeout: Duration) -> &mut Self {
        self.inner.socket_timeout = Some(socket_timeout);
        self
    }

    /// 设置等待 `100 Continue` 的时长
    #[inline]
    pub fn wait_for_continue(&mut self, wait_for_continue: Duration) -> &mut Self {
        self.inner.wait_for_continue = wait_for_continue;
        self
    }

    /// 构建请求执行器配置
    #[inline]
    pub fn build(&self) -> DirectorConfig {
        self.inner.to_owned()
    }
}
