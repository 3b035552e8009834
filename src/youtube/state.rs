use std::fmt;

/// 1回の解決呼び出しの状態
///
/// `Pending → {Retrying(n) → Pending}* → {Resolved | Unavailable | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// 試行待ち・試行中
    Pending,
    /// n回目の失敗後、再試行待ち
    Retrying(u32),
    Resolved,
    Unavailable,
    Failed,
}

impl ResolutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResolutionState::Resolved | ResolutionState::Unavailable | ResolutionState::Failed
        )
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionState::Pending => write!(f, "pending"),
            ResolutionState::Retrying(n) => write!(f, "retrying({})", n),
            ResolutionState::Resolved => write!(f, "resolved"),
            ResolutionState::Unavailable => write!(f, "unavailable"),
            ResolutionState::Failed => write!(f, "failed"),
        }
    }
}

/// 解決呼び出しの状態遷移を管理する構造体
///
/// 終端への遷移は `self` を消費するため、終端後に試行を始めることはできない。
#[derive(Debug, Clone)]
pub struct ResolutionTracker {
    resource: String,
    state: ResolutionState,
    attempts: u32,
}

impl ResolutionTracker {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            state: ResolutionState::Pending,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    /// 開始済みの試行回数
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// 試行を開始（Retrying → Pending）し、通算の試行番号を返す
    pub fn begin_attempt(&mut self) -> u32 {
        self.state = ResolutionState::Pending;
        self.attempts += 1;
        self.attempts
    }

    /// 一時的な失敗を記録して再試行待ちへ
    pub fn retry(&mut self) {
        self.state = ResolutionState::Retrying(self.attempts);
        log::debug!(
            "Resolution of '{}' did not succeed (attempt {}), moving on",
            self.resource,
            self.attempts
        );
    }

    pub fn resolve(self) -> ResolutionState {
        self.finish(ResolutionState::Resolved)
    }

    pub fn mark_unavailable(self) -> ResolutionState {
        self.finish(ResolutionState::Unavailable)
    }

    pub fn fail(self) -> ResolutionState {
        self.finish(ResolutionState::Failed)
    }

    fn finish(self, terminal: ResolutionState) -> ResolutionState {
        log::debug!(
            "Resolution of '{}' finished: {} after {} attempt(s)",
            self.resource,
            terminal,
            self.attempts
        );
        terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let tracker = ResolutionTracker::new("dQw4w9WgXcQ");
        assert_eq!(tracker.state(), ResolutionState::Pending);
        assert_eq!(tracker.attempts(), 0);
    }

    #[test]
    fn test_retry_cycle() {
        let mut tracker = ResolutionTracker::new("id");
        assert_eq!(tracker.begin_attempt(), 1);
        tracker.retry();
        assert_eq!(tracker.state(), ResolutionState::Retrying(1));
        assert_eq!(tracker.begin_attempt(), 2);
        assert_eq!(tracker.state(), ResolutionState::Pending);
        assert_eq!(tracker.attempts(), 2);
        assert_eq!(tracker.resolve(), ResolutionState::Resolved);
    }

    #[test]
    fn test_terminal_states() {
        type Finish = fn(ResolutionTracker) -> ResolutionState;
        let finishers: [(Finish, ResolutionState); 3] = [
            (ResolutionTracker::resolve, ResolutionState::Resolved),
            (ResolutionTracker::mark_unavailable, ResolutionState::Unavailable),
            (ResolutionTracker::fail, ResolutionState::Failed),
        ];
        for (finish, expected) in finishers {
            let mut tracker = ResolutionTracker::new("id");
            tracker.begin_attempt();
            let state = finish(tracker);
            assert_eq!(state, expected);
            assert!(state.is_terminal());
        }
        assert!(!ResolutionState::Retrying(1).is_terminal());
        assert!(!ResolutionState::Pending.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(ResolutionState::Retrying(3).to_string(), "retrying(3)");
        assert_eq!(ResolutionState::Unavailable.to_string(), "unavailable");
    }
}
