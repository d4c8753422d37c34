use std::{
    io::{BufRead, BufReader, Write},
    os::fd::{AsRawFd, FromRawFd},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use nix::unistd::{dup, dup2};

use crate::schema::v0;

/// The operations a resource provider implements.
///
/// `diff` is pure: it decides locally whether `update` needs to be called.
/// The other operations talk to whatever system actually holds the resource.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    async fn create(&self, request: v0::CreateResourceRequest)
        -> Result<v0::CreateResourceResponse>;

    fn diff(&self, request: v0::DiffResourceRequest) -> Result<v0::DiffResourceResponse>;

    async fn update(&self, request: v0::UpdateResourceRequest)
        -> Result<v0::UpdateResourceResponse>;

    async fn delete(&self, request: v0::DeleteResourceRequest)
        -> Result<v0::DeleteResourceResponse>;
}

/// Route a request to the matching provider operation.
pub async fn dispatch(
    provider: &impl ResourceProvider,
    request: v0::Request,
) -> Result<v0::Response> {
    let response = match request {
        v0::Request::Create(r) => v0::Response::Create(
            provider
                .create(r)
                .await
                .with_context(|| "Could not create resource")?,
        ),
        v0::Request::Diff(r) => v0::Response::Diff(
            provider
                .diff(r)
                .with_context(|| "Could not diff resource")?,
        ),
        v0::Request::Update(r) => v0::Response::Update(
            provider
                .update(r)
                .await
                .with_context(|| "Could not update resource")?,
        ),
        v0::Request::Delete(r) => v0::Response::Delete(
            provider
                .delete(r)
                .await
                .with_context(|| "Could not delete resource")?,
        ),
    };
    Ok(response)
}

/// Run a provider process: read one request, answer it, and return.
/// Exits the process with status 1 if anything fails.
pub async fn run_main(provider: impl ResourceProvider) {
    let pipe = init_stdio().map(pipe_fds_to_files).unwrap_or_exit();

    let request = read_request(pipe.in_).unwrap_or_exit();
    let response = dispatch(&provider, request).await.unwrap_or_exit();
    write_response(pipe.out, &response).unwrap_or_exit();
}

fn read_request(input: impl std::io::Read) -> Result<v0::Request> {
    let mut in_ = BufReader::new(input);
    let mut line = String::new();
    in_.read_line(&mut line)
        .with_context(|| "Could not read line for request message")?;
    serde_json::from_str(&line).with_context(|| "Could not parse request message")
}

fn write_response(mut output: impl Write, response: &v0::Response) -> Result<()> {
    serde_json::to_writer(&mut output, response)
        .with_context(|| "Could not write response message")?;
    output.write_all(b"\n")?;
    output.flush()?;
    Ok(())
}

/// A pair of `T` values: one for input and one for output.
struct InOut<T> {
    in_: T,
    out: T,
}

/// A file descriptor
type Fd = i32;

/// Configure the standard input/output streams for the process.
/// This returns the communication channels with the caller, and reconfigures
/// the stdio file descriptors as follows:
///
/// ```text
/// 0: /dev/null
/// 1: stderr
/// 2: stderr
/// ```
fn init_stdio() -> Result<InOut<Fd>> {
    let r = InOut {
        in_: dup(0).with_context(|| "dup(0)")?,
        out: dup(1).with_context(|| "dup(1)")?,
    };

    // 0: dev/null
    {
        let dev_null =
            std::fs::File::open("/dev/null").with_context(|| "Could not open /dev/null")?;
        dup2(dev_null.as_raw_fd(), 0).with_context(|| "Could not dup2(/dev/null, 0)")?;
    }

    // 1: stderr
    dup2(2, 1).with_context(|| "Could not dup2(2, 1)")?;

    // 2: stderr is left as is

    Ok(r)
}

fn pipe_fds_to_files(pipe: InOut<Fd>) -> InOut<std::fs::File> {
    // SAFETY: both descriptors were just returned by dup, and nothing else owns them
    InOut {
        in_: unsafe { std::fs::File::from_raw_fd(pipe.in_) },
        out: unsafe { std::fs::File::from_raw_fd(pipe.out) },
    }
}

trait TableOpsMainError<T> {
    type V;
    fn unwrap_or_exit(self) -> Self::V;
}
impl<T> TableOpsMainError<Result<T>> for Result<T> {
    type V = T;
    fn unwrap_or_exit(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Error: {:?}", e);
                std::process::exit(1);
            }
        }
    }
}
