use assert_impl::assert_impl;
use http::{
    header::{HeaderMap, HeaderName, HeaderValue, IntoHeaderName},
    status::StatusCode,
    Version,
};
use std::{
    default::Default,
    fmt::Debug,
    io::{Cursor, Read, Result as IoResult},
    net::SocketAddr,
};

trait ReadDebug: Read + Debug + Send + Sync {}
impl<T: Read + Debug + Send + Sync> ReadDebug for T {}

/// HTTP 响应信息
///
/// 包含状态行和 HTTP Headers，不包含响应体
#[derive(Clone, Debug)]
pub struct ResponseParts {
    status_code: StatusCode,
    version: Version,
    headers: HeaderMap,
    server_addr: Option<SocketAddr>,
}

impl Default for ResponseParts {
    #[inline]
    fn default() -> Self {
        Self {
            status_code: StatusCode::OK,
            version: Version::HTTP_11,
            headers: Default::default(),
            server_addr: None,
        }
    }
}

impl ResponseParts {
    /// 创建 HTTP 响应信息
    #[inline]
    pub fn new(status_code: StatusCode, version: Version, headers: HeaderMap) -> Self {
        Self {
            status_code,
            version,
            headers,
            server_addr: None,
        }
    }

    /// HTTP 状态码
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// 修改 HTTP 状态码
    #[inline]
    pub fn status_code_mut(&mut self) -> &mut StatusCode {
        &mut self.status_code
    }

    /// HTTP 版本
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// 修改 HTTP 版本
    #[inline]
    pub fn version_mut(&mut self) -> &mut Version {
        &mut self.version
    }

    /// HTTP Headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// 修改 HTTP Headers
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// 获取 HTTP 响应 Header
    #[inline]
    pub fn header(&self, header_name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(header_name.as_ref())
    }

    /// HTTP 服务器套接字地址
    #[inline]
    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server_addr
    }

    /// 修改 HTTP 服务器套接字地址
    #[inline]
    pub fn server_addr_mut(&mut self) -> &mut Option<SocketAddr> {
        &mut self.server_addr
    }

    /// 是否为临时响应（1xx）
    #[inline]
    pub fn is_interim(&self) -> bool {
        self.status_code.is_informational()
    }
}

/// HTTP 响应体
///
/// 数据流形式的响应体通常直接从连接上读取，读取完毕前连接不能被释放
#[derive(Debug)]
pub struct ResponseBody(ResponseBodyInner);

#[derive(Debug)]
enum ResponseBodyInner {
    Reader(Box<dyn ReadDebug>),
    Bytes(Cursor<Vec<u8>>),
}

impl Default for ResponseBody {
    #[inline]
    fn default() -> Self {
        Self(ResponseBodyInner::Bytes(Default::default()))
    }
}

impl ResponseBody {
    /// 创建二进制字节数组形式的响应体
    #[inline]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(ResponseBodyInner::Bytes(Cursor::new(bytes.into())))
    }

    /// 创建数据流形式的响应体
    #[inline]
    pub fn from_reader(reader: impl Read + Debug + Send + Sync + 'static) -> Self {
        Self(ResponseBodyInner::Reader(Box::new(reader)))
    }

    /// 是否为数据流形式的响应体
    #[inline]
    pub fn is_streaming(&self) -> bool {
        matches!(&self.0, ResponseBodyInner::Reader(_))
    }

    /// 获取尚未读取的缓存数据
    ///
    /// 仅对二进制字节数组形式的响应体有效
    pub fn remaining_bytes(&self) -> Option<&[u8]> {
        match &self.0 {
            ResponseBodyInner::Bytes(bytes) => {
                let position = (bytes.position() as usize).min(bytes.get_ref().len());
                Some(&bytes.get_ref()[position..])
            }
            ResponseBodyInner::Reader(_) => None,
        }
    }
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.0 {
            ResponseBodyInner::Reader(reader) => reader.read(buf),
            ResponseBodyInner::Bytes(bytes) => bytes.read(buf),
        }
    }
}

/// HTTP 响应
///
/// 封装 HTTP 响应相关字段
#[derive(Debug, Default)]
pub struct Response {
    parts: ResponseParts,
    body: ResponseBody,
}

impl Response {
    /// 返回 HTTP 响应构建器
    #[inline]
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// 通过响应信息和响应体创建 HTTP 响应
    #[inline]
    pub fn from_parts(parts: ResponseParts, body: ResponseBody) -> Self {
        Self { parts, body }
    }

    /// 拆分为响应信息和响应体
    #[inline]
    pub fn into_parts(self) -> (ResponseParts, ResponseBody) {
        (self.parts, self.body)
    }

    /// 获取响应信息
    #[inline]
    pub fn parts(&self) -> &ResponseParts {
        &self.parts
    }

    /// HTTP 状态码
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.parts.status_code()
    }

    /// 修改 HTTP 状态码
    #[inline]
    pub fn status_code_mut(&mut self) -> &mut StatusCode {
        self.parts.status_code_mut()
    }

    /// HTTP Headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        self.parts.headers()
    }

    /// 修改 HTTP Headers
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.parts.headers_mut()
    }

    /// HTTP 版本
    #[inline]
    pub fn version(&self) -> Version {
        self.parts.version()
    }

    /// 获取 HTTP 响应 Header
    #[inline]
    pub fn header(&self, header_name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.parts.header(header_name)
    }

    /// HTTP 服务器套接字地址
    #[inline]
    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.parts.server_addr()
    }

    /// HTTP 响应体
    #[inline]
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// 修改 HTTP 响应体
    #[inline]
    pub fn body_mut(&mut self) -> &mut ResponseBody {
        &mut self.body
    }

    /// 直接获取 HTTP 响应体
    #[inline]
    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

/// HTTP 响应构建器
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    inner: Response,
}

impl ResponseBuilder {
    /// 设置 HTTP 状态码
    #[inline]
    pub fn status_code(mut self, status_code: StatusCode) -> Self {
        *self.inner.status_code_mut() = status_code;
        self
    }

    /// 设置 HTTP Headers
    #[inline]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        *self.inner.headers_mut() = headers;
        self
    }

    /// 设置 HTTP 版本
    #[inline]
    pub fn version(mut self, version: Version) -> Self {
        *self.inner.parts.version_mut() = version;
        self
    }

    /// 设置 HTTP 服务器套接字地址
    #[inline]
    pub fn server_addr(mut self, server_addr: SocketAddr) -> Self {
        *self.inner.parts.server_addr_mut() = Some(server_addr);
        self
    }

    /// 添加 HTTP Header
    #[inline]
    pub fn header(mut self, header_name: impl IntoHeaderName, header_value: HeaderValue) -> Self {
        self.inner.headers_mut().insert(header_name, header_value);
        self
    }

    /// 追加 HTTP Header，不覆盖同名 Header
    #[inline]
    pub fn append_header(mut self, header_name: HeaderName, header_value: HeaderValue) -> Self {
        self.inner.headers_mut().append(header_name, header_value);
        self
    }

    /// 设置数据流为 HTTP 响应体
    #[inline]
    pub fn stream_as_body(mut self, body: impl Read + Debug + Send + Sync + 'static) -> Self {
        *self.inner.body_mut() = ResponseBody::from_reader(body);
        self
    }

    /// 设置二进制字节数组为 HTTP 响应体
    #[inline]
    pub fn bytes_as_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        *self.inner.body_mut() = ResponseBody::from_bytes(body);
        self
    }

    /// 构建 HTTP 响应
    #[inline]
    pub fn build(self) -> Response {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{error::Error, result::Result};

    #[test]
    fn test_response_builder() -> Result<(), Box<dyn Error>> {
        let mut response = Response::builder()
            .status_code(StatusCode::CREATED)
            .header("x-reqid", HeaderValue::from_static("abc"))
            .bytes_as_body(b"body".to_vec())
            .build();
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(response.header("x-reqid"), Some(&HeaderValue::from_static("abc")));
        assert!(!response.body().is_streaming());

        let mut buf = [0u8; 2];
        response.body_mut().read_exact(&mut buf)?;
        assert_eq!(response.body().remaining_bytes(), Some(&b"dy"[..]));
        Ok(())
    }

    #[test]
    fn test_interim_parts() {
        let parts = ResponseParts::new(StatusCode::CONTINUE, Version::HTTP_11, Default::default());
        assert!(parts.is_interim());
        assert!(!ResponseParts::default().is_interim());
    }
}
