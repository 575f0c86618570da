use assert_impl::assert_impl;
use http::{
    header::{HeaderMap, HeaderName, HeaderValue, IntoHeaderName},
    method::Method,
    uri::Uri,
    Version,
};
use std::{
    fmt::{self, Debug},
    io::{Cursor, Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult},
    mem::take,
};

/// HTTP 请求信息
///
/// 不包含请求体信息，可以被克隆，因此可以在重定向或重新鉴权时作为新请求的基础
#[derive(Clone, Debug)]
pub struct RequestParts {
    method: Method,
    url: Uri,
    version: Version,
    headers: HeaderMap,
}

impl Default for RequestParts {
    #[inline]
    fn default() -> Self {
        Self {
            method: Method::GET,
            url: Uri::from_static("/"),
            version: Version::HTTP_11,
            headers: Default::default(),
        }
    }
}

impl RequestParts {
    /// 获取 HTTP 请求 URL
    #[inline]
    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// 获取 HTTP 请求 URL 的可变引用
    #[inline]
    pub fn url_mut(&mut self) -> &mut Uri {
        &mut self.url
    }

    /// 获取请求 HTTP 版本
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// 获取请求 HTTP 版本的可变引用
    #[inline]
    pub fn version_mut(&mut self) -> &mut Version {
        &mut self.version
    }

    /// 获取请求 HTTP 方法
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// 获取请求 HTTP 方法的可变引用
    #[inline]
    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    /// 获取请求 HTTP Headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// 获取请求 HTTP Headers 的可变引用
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// 获取请求 HTTP Header
    #[inline]
    pub fn header(&self, header_name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(header_name.as_ref())
    }
}

trait ReadDebug: Read + Debug + Send + Sync {}
impl<T: Read + Debug + Send + Sync> ReadDebug for T {}

/// HTTP 请求体
///
/// 二进制字节数组形式的请求体可以被重置并反复发送，数据流形式的请求体只能发送一次
#[derive(Debug)]
pub struct RequestBody(RequestBodyInner);

#[derive(Debug)]
enum RequestBodyInner {
    Bytes(Cursor<Vec<u8>>),
    Reader {
        reader: Box<dyn ReadDebug>,
        size: Option<u64>,
    },
}

impl Default for RequestBody {
    #[inline]
    fn default() -> Self {
        Self(RequestBodyInner::Bytes(Default::default()))
    }
}

impl RequestBody {
    /// 创建二进制字节数组形式的请求体
    #[inline]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(RequestBodyInner::Bytes(Cursor::new(bytes.into())))
    }

    /// 创建数据流形式的请求体
    #[inline]
    pub fn from_reader(reader: impl Read + Debug + Send + Sync + 'static, size: Option<u64>) -> Self {
        Self(RequestBodyInner::Reader {
            reader: Box::new(reader),
            size,
        })
    }

    /// 获取请求体长度，未知长度时返回 [`None`]
    #[inline]
    pub fn size(&self) -> Option<u64> {
        match &self.0 {
            RequestBodyInner::Bytes(bytes) => Some(bytes.get_ref().len() as u64),
            RequestBodyInner::Reader { size, .. } => *size,
        }
    }

    /// 请求体是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == Some(0)
    }

    /// 请求体是否可以反复发送
    #[inline]
    pub fn is_repeatable(&self) -> bool {
        matches!(&self.0, RequestBodyInner::Bytes(_))
    }

    /// 重置请求体，以便重新发送
    ///
    /// 数据流形式的请求体无法重置
    pub fn reset(&mut self) -> IoResult<()> {
        match &mut self.0 {
            RequestBodyInner::Bytes(bytes) => {
                bytes.set_position(0);
                Ok(())
            }
            RequestBodyInner::Reader { .. } => Err(IoError::new(
                IoErrorKind::Unsupported,
                "streaming request body can not be reset",
            )),
        }
    }

    /// 尝试复制请求体
    ///
    /// 仅二进制字节数组形式的请求体可以被复制
    pub fn try_clone(&self) -> Option<Self> {
        match &self.0 {
            RequestBodyInner::Bytes(bytes) => Some(Self::from_bytes(bytes.get_ref().to_owned())),
            RequestBodyInner::Reader { .. } => None,
        }
    }
}

impl Read for RequestBody {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.0 {
            RequestBodyInner::Bytes(bytes) => bytes.read(buf),
            RequestBodyInner::Reader { reader, .. } => reader.read(buf),
        }
    }
}

impl From<Vec<u8>> for RequestBody {
    #[inline]
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&'static str> for RequestBody {
    #[inline]
    fn from(s: &'static str) -> Self {
        Self::from_bytes(s.as_bytes())
    }
}

/// HTTP 请求
///
/// 封装 HTTP 请求相关字段
#[derive(Default)]
pub struct Request {
    parts: RequestParts,
    body: RequestBody,
}

impl Request {
    /// 创建 HTTP 请求构建器
    #[inline]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// 通过请求信息和请求体创建 HTTP 请求
    #[inline]
    pub fn from_parts(parts: RequestParts, body: RequestBody) -> Self {
        Self { parts, body }
    }

    /// 获取请求信息
    #[inline]
    pub fn parts(&self) -> &RequestParts {
        &self.parts
    }

    /// 获取请求信息的可变引用
    #[inline]
    pub fn parts_mut(&mut self) -> &mut RequestParts {
        &mut self.parts
    }

    /// 获取请求体
    #[inline]
    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// 获取请求体的可变引用
    #[inline]
    pub fn body_mut(&mut self) -> &mut RequestBody {
        &mut self.body
    }

    /// 拆分为请求信息和请求体
    #[inline]
    pub fn into_parts(self) -> (RequestParts, RequestBody) {
        (self.parts, self.body)
    }

    /// 获取 HTTP 请求 URL
    #[inline]
    pub fn url(&self) -> &Uri {
        self.parts.url()
    }

    /// 获取请求 HTTP 方法
    #[inline]
    pub fn method(&self) -> &Method {
        self.parts.method()
    }

    /// 获取请求 HTTP Headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        self.parts.headers()
    }

    /// 尝试复制 HTTP 请求
    ///
    /// 请求体不可重复发送时返回 [`None`]
    #[inline]
    pub fn try_clone(&self) -> Option<Self> {
        let body = self.body.try_clone()?;
        Some(Self {
            parts: self.parts.to_owned(),
            body,
        })
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

impl Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", self.parts.method())
            .field("url", self.parts.url())
            .field("version", &self.parts.version())
            .field("headers", self.parts.headers())
            .field("body_size", &self.body.size())
            .finish()
    }
}

/// HTTP 请求构建器
#[derive(Debug, Default)]
pub struct RequestBuilder {
    inner: Request,
}

impl RequestBuilder {
    /// 设置 HTTP 请求 URL
    #[inline]
    pub fn url(&mut self, url: Uri) -> &mut Self {
        *self.inner.parts.url_mut() = url;
        self
    }

    /// 设置请求 HTTP 方法
    #[inline]
    pub fn method(&mut self, method: Method) -> &mut Self {
        *self.inner.parts.method_mut() = method;
        self
    }

    /// 设置请求 HTTP 版本
    #[inline]
    pub fn version(&mut self, version: Version) -> &mut Self {
        *self.inner.parts.version_mut() = version;
        self
    }

    /// 设置请求 HTTP Headers
    #[inline]
    pub fn headers(&mut self, headers: HeaderMap) -> &mut Self {
        *self.inner.parts.headers_mut() = headers;
        self
    }

    /// 插入请求 HTTP Header
    #[inline]
    pub fn header(&mut self, header_name: impl IntoHeaderName, header_value: HeaderValue) -> &mut Self {
        self.inner.parts.headers_mut().insert(header_name, header_value);
        self
    }

    /// 追加请求 HTTP Header，不覆盖同名 Header
    #[inline]
    pub fn append_header(&mut self, header_name: HeaderName, header_value: HeaderValue) -> &mut Self {
        self.inner.parts.headers_mut().append(header_name, header_value);
        self
    }

    /// 设置请求体
    #[inline]
    pub fn body(&mut self, body: impl Into<RequestBody>) -> &mut Self {
        *self.inner.body_mut() = body.into();
        self
    }

    /// 设置二进制字节数组为请求体
    #[inline]
    pub fn bytes_as_body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        *self.inner.body_mut() = RequestBody::from_bytes(body);
        self
    }

    /// 设置数据流为请求体
    #[inline]
    pub fn stream_as_body(
        &mut self,
        body: impl Read + Debug + Send + Sync + 'static,
        size: Option<u64>,
    ) -> &mut Self {
        *self.inner.body_mut() = RequestBody::from_reader(body, size);
        self
    }

    /// 构建 HTTP 请求
    #[inline]
    pub fn build(&mut self) -> Request {
        take(&mut self.inner)
    }
}
