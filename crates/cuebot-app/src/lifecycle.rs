//! 라이프사이클 관리.
//!
//! OS 시그널을 종료/설정 리로드 요청으로 변환한다.
//! - SIGINT, SIGTERM (Windows: Ctrl+C) → 종료
//! - SIGHUP (unix) → 설정 리로드

use std::io;

use tracing::info;

/// 프로세스 제어 요청
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Shutdown,
    Reload,
}

/// 라이프사이클 관리자: 시그널 핸들러는 생성 시 한 번 등록한다
pub struct LifecycleManager {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sighup: tokio::signal::unix::Signal,
}

impl LifecycleManager {
    /// 시그널 핸들러 등록
    pub fn new() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                sigint: signal(SignalKind::interrupt())?,
                sigterm: signal(SignalKind::terminate())?,
                sighup: signal(SignalKind::hangup())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// 다음 제어 요청 대기
    pub async fn wait_for_signal(&mut self) -> io::Result<ControlSignal> {
        #[cfg(unix)]
        {
            let signal = tokio::select! {
                _ = self.sigint.recv() => {
                    info!("SIGINT 수신");
                    ControlSignal::Shutdown
                }
                _ = self.sigterm.recv() => {
                    info!("SIGTERM 수신");
                    ControlSignal::Shutdown
                }
                _ = self.sighup.recv() => {
                    info!("SIGHUP 수신");
                    ControlSignal::Reload
                }
            };
            Ok(signal)
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await?;
            info!("Ctrl+C 수신");
            Ok(ControlSignal::Shutdown)
        }
    }
}
