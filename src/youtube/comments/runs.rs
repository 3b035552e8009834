//! リッチテキストの断片化
//!
//! コメント本文とコマンド範囲（リンク等の装飾、UTF-16単位のオフセット）から
//! 断片列を作る。装飾の意味は捨て、文字列だけを残す。
//! 改行（"\n" / "\r\n"）は単独の断片として出力する。

use thiserror::Error;

use crate::youtube::types::CommandRun;

const LF: u16 = b'\n' as u16;
const CR: u16 = b'\r' as u16;

/// コマンド範囲の不整合
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("command run {index} extends past the end of the text")]
    OutOfBounds { index: usize },

    #[error("command run {index} overlaps the previous run")]
    Overlap { index: usize },

    #[error("segment boundary splits a surrogate pair")]
    SplitSurrogate,
}

impl RunError {
    /// 不整合の原因となったフィールドの相対パス
    pub fn field_path(&self) -> String {
        match self {
            RunError::OutOfBounds { index } | RunError::Overlap { index } => {
                format!("commandRuns[{}]", index)
            }
            RunError::SplitSurrogate => "commandRuns".to_string(),
        }
    }
}

/// 範囲の検証
///
/// 開始位置が直前の範囲より前にあるもの（古い範囲）は重なりとはみなさず、
/// 走査時に読み飛ばす。
fn validate(len: usize, runs: &[CommandRun]) -> Result<(), RunError> {
    let mut last: Option<&CommandRun> = None;

    for (index, run) in runs.iter().enumerate() {
        match run.start_index.checked_add(run.length) {
            Some(end) if end <= len => {}
            _ => return Err(RunError::OutOfBounds { index }),
        }

        if run.length == 0 {
            continue;
        }
        match last {
            Some(prev) if run.start_index < prev.start_index => {}
            Some(prev) if run.start_index < prev.end() => {
                return Err(RunError::Overlap { index });
            }
            _ => last = Some(run),
        }
    }
    Ok(())
}

/// `pos` にある改行の長さ
fn line_break_at(units: &[u16], pos: usize) -> Option<usize> {
    match units.get(pos) {
        Some(&CR) if units.get(pos + 1) == Some(&LF) => Some(2),
        Some(&LF) => Some(1),
        _ => None,
    }
}

fn flush(current: &mut Vec<u16>, segments: &mut Vec<String>) -> Result<(), RunError> {
    if current.is_empty() {
        return Ok(());
    }
    let segment = String::from_utf16(current).map_err(|_| RunError::SplitSurrogate)?;
    segments.push(segment);
    current.clear();
    Ok(())
}

/// テキストを断片列に分解
///
/// 連結すると元のテキストに戻る。範囲の内側は改行を含んでいても
/// 1つの塊として現在の断片に追加する。
///
/// # Examples
/// ```
/// use innertube_harvest::youtube::comments::runs::reconstruct;
/// use innertube_harvest::youtube::types::CommandRun;
///
/// let segments = reconstruct("see https://a.b\nok", &[CommandRun::new(4, 11)]).unwrap();
/// assert_eq!(segments, vec!["see https://a.b", "\n", "ok"]);
/// ```
pub fn reconstruct(text: &str, runs: &[CommandRun]) -> Result<Vec<String>, RunError> {
    let units: Vec<u16> = text.encode_utf16().collect();
    validate(units.len(), runs)?;

    let mut segments = Vec::new();
    let mut current: Vec<u16> = Vec::new();
    let mut pos = 0;
    let mut cursor = 0;

    while pos < units.len() {
        let run = runs
            .get(cursor)
            .filter(|run| run.start_index == pos && run.length > 0);

        // 走査位置の改行は範囲より優先する（改行から始まる範囲は古い範囲になる）
        if let Some(len) = line_break_at(&units, pos) {
            flush(&mut current, &mut segments)?;
            segments.push(String::from_utf16_lossy(&units[pos..pos + len]));
            pos += len;
        } else if let Some(run) = run {
            current.extend_from_slice(&units[run.start_index..run.end()]);
            pos = run.end();
        } else {
            current.push(units[pos]);
            pos += 1;
        }

        // 走査位置を過ぎた範囲（長さ0・古い範囲を含む）は捨てる
        while runs.get(cursor).is_some_and(|run| run.start_index < pos) {
            cursor += 1;
        }
    }

    flush(&mut current, &mut segments)?;
    Ok(segments)
}
