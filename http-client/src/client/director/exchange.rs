use super::super::{is_response_body_empty, ExecutionContext, ResponseResult};
use courier_http::{
    Error as HttpError, ErrorKind as HttpErrorKind, ManagedConnection, Method, RequestBody, RequestParts,
    ResponseParts, StatusCode,
};
use log::debug;
use std::time::Duration;

const DISCARD_BUFFER_SIZE: usize = 8192;

/// 在连接上发送一次请求并读取响应头
///
/// 中间响应（1xx）不会被返回。要求 `100 Continue` 时，
/// 在等待时间内收到最终响应则不再发送请求体，超时则直接发送请求体
pub(super) fn exchange(
    conn: &mut dyn ManagedConnection,
    parts: &RequestParts,
    body: &mut RequestBody,
    expect_continue: Option<Duration>,
    ctx: &mut ExecutionContext,
) -> ResponseResult<ResponseParts> {
    debug!("Sending request: {} {}", parts.method(), parts.url());
    conn.send_request_head(parts)?;
    ctx.increase_requests_sent();

    let mut early_response = None;
    if let Some(wait_for_continue) = expect_continue {
        conn.flush()?;
        if conn.is_response_available(wait_for_continue)? {
            let response = conn.receive_response_head()?;
            match response.status_code() {
                StatusCode::CONTINUE => debug!("Received 100 Continue, sending request body"),
                status_code if status_code.is_informational() => {
                    return Err(HttpError::new(
                        HttpErrorKind::ProtocolError,
                        format!("Unexpected response: {}", status_code),
                    )
                    .into());
                }
                _ => early_response = Some(response),
            }
        } else {
            debug!("No response within {:?}, sending request body anyway", wait_for_continue);
        }
    }

    if early_response.is_none() {
        conn.send_request_body(body)?;
    }
    conn.flush()?;

    let mut response = match early_response {
        Some(response) => response,
        None => receive_final_response(conn)?,
    };
    if response.server_addr().is_none() {
        *response.server_addr_mut() = conn.remote_addr();
    }
    debug!("Received response: {:?} {}", response.version(), response.status_code());
    Ok(response)
}

fn receive_final_response(conn: &mut dyn ManagedConnection) -> ResponseResult<ResponseParts> {
    loop {
        let response = conn.receive_response_head()?;
        if !response.is_interim() {
            return Ok(response);
        }
        debug!("Skipping interim response {}", response.status_code());
    }
}

/// 读取并丢弃响应体，使连接可以继续使用
pub(super) fn discard_response_body(
    conn: &mut dyn ManagedConnection,
    method: &Method,
    response: &ResponseParts,
) -> ResponseResult<()> {
    if is_response_body_empty(method, response) {
        return Ok(());
    }
    let mut buf = [0u8; DISCARD_BUFFER_SIZE];
    while conn.read_response_body(&mut buf)? > 0 {}
    Ok(())
}

/// 将响应体完整读取到内存中
pub(super) fn buffer_response_body(
    conn: &mut dyn ManagedConnection,
    method: &Method,
    response: &ResponseParts,
) -> ResponseResult<Vec<u8>> {
    let mut body = Vec::new();
    if is_response_body_empty(method, response) {
        return Ok(body);
    }
    let mut buf = [0u8; DISCARD_BUFFER_SIZE];
    loop {
        match conn.read_response_body(&mut buf)? {
            0 => return Ok(body),
            have_read => body.extend_from_slice(&buf[..have_read]),
        }
    }
}
