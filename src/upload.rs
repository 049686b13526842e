//! 上传文件。
//!
//! 文件内容先保存在内存中，超过阈值后自动转存到临时文件。
//! 转存到磁盘后的读写是阻塞 I/O，会被放到 tokio 的阻塞线程池中执行。

use std::{
    fmt,
    io::{self, Read, Seek, SeekFrom, Write},
    sync::{Arc, Mutex},
};

use crate::{exception::Exception, header::Headers};

use log::debug;
use tempfile::SpooledTempFile;

type SharedFile = Arc<Mutex<Option<SpooledTempFile>>>;

/// multipart 请求中的一个文件字段。
///
/// 由产生它的表单独占；调用方必须在请求结束前调用 [`UploadFile::close`]，
/// 否则临时文件要等到值被丢弃时才会释放。
pub struct UploadFile {
    filename: String,
    headers: Headers,
    file: SharedFile,
}

impl UploadFile {
    /// 以初始内容创建上传文件，读写位置回到开头。
    pub fn new(
        filename: &str,
        data: &[u8],
        spool_max_size: usize,
        headers: Headers,
    ) -> Result<Self, Exception> {
        let mut file = SpooledTempFile::new(spool_max_size);
        if !data.is_empty() {
            file.write_all(data)?;
            file.seek(SeekFrom::Start(0))?;
        }
        if file.is_rolled() {
            debug!("上传文件{}超过{}字节，已转存到临时文件", filename, spool_max_size);
        }
        Ok(Self {
            filename: filename.to_string(),
            headers,
            file: Arc::new(Mutex::new(Some(file))),
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn content_type(&self) -> Option<String> {
        self.headers.get("content-type")
    }

    /// 内容是否已经转存到磁盘
    pub fn is_rolled(&self) -> bool {
        match lock(&self.file).as_ref() {
            Some(file) => file.is_rolled(),
            None => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.file).is_none()
    }

    /// 立即转存到磁盘
    pub fn roll(&self) -> Result<(), Exception> {
        apply(&self.file, |file| file.roll())
    }

    pub async fn write(&self, data: &[u8]) -> Result<usize, Exception> {
        let data = data.to_vec();
        self.run(move |file| {
            file.write_all(&data)?;
            Ok(data.len())
        })
        .await
    }

    /// 从当前位置读取，`None` 表示读到末尾。
    pub async fn read(&self, size: Option<usize>) -> Result<Vec<u8>, Exception> {
        self.run(move |file| {
            let mut buffer = Vec::new();
            match size {
                Some(size) => {
                    file.take(size as u64).read_to_end(&mut buffer)?;
                }
                None => {
                    file.read_to_end(&mut buffer)?;
                }
            }
            Ok(buffer)
        })
        .await
    }

    pub async fn seek(&self, offset: u64) -> Result<u64, Exception> {
        self.run(move |file| file.seek(SeekFrom::Start(offset))).await
    }

    /// 文件总长度，不改变读写位置。
    pub async fn size(&self) -> Result<u64, Exception> {
        self.run(|file| {
            let position = file.stream_position()?;
            let end = file.seek(SeekFrom::End(0))?;
            file.seek(SeekFrom::Start(position))?;
            Ok(end)
        })
        .await
    }

    /// 释放底层存储。重复关闭是安全的。
    pub async fn close(&self) -> Result<(), Exception> {
        let file = Arc::clone(&self.file);
        let rolled = self.is_rolled();
        let release = move || {
            lock(&file).take();
        };
        if rolled {
            tokio::task::spawn_blocking(release)
                .await
                .map_err(|e| Exception::Io(e.to_string()))?;
        } else {
            release();
        }
        debug!("上传文件{}已关闭", self.filename);
        Ok(())
    }

    async fn run<R, F>(&self, op: F) -> Result<R, Exception>
    where
        F: FnOnce(&mut SpooledTempFile) -> io::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        if !self.is_rolled() {
            return apply(&self.file, op);
        }
        let file = Arc::clone(&self.file);
        match tokio::task::spawn_blocking(move || apply(&file, op)).await {
            Ok(result) => result,
            Err(e) => Err(Exception::Io(e.to_string())),
        }
    }
}

fn lock(file: &SharedFile) -> std::sync::MutexGuard<'_, Option<SpooledTempFile>> {
    match file.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn apply<R, F>(file: &SharedFile, op: F) -> Result<R, Exception>
where
    F: FnOnce(&mut SpooledTempFile) -> io::Result<R>,
{
    match lock(file).as_mut() {
        Some(file) => op(file).map_err(Exception::from),
        None => Err(Exception::UploadClosed),
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("filename", &self.filename)
            .field("headers", &self.headers.items())
            .finish()
    }
}
