//! Nickname rules for the snake leaderboard

use thiserror::Error;

pub const MIN_LEN: usize = 2;
pub const MAX_LEN: usize = 10;

const BANNED_WORDS: &[&str] = &[
    "管理员", "客服", "系统", "官方", "政府", "习近平", "毛泽东", "邓小平",
    "法轮功", "台独", "港独", "疆独", "藏独", "反华", "共产党", "民主党",
    "操", "妈的", "傻逼", "草泥马", "尼玛", "卧槽", "我靠", "他妈的",
    "脑残", "智障", "白痴", "弱智", "贱人", "婊子", "妓女", "鸡巴",
    "赌博", "代孕", "色情", "毒品", "贷款", "投资", "理财", "股票",
    "彩票", "中奖", "兼职", "招聘", "刷单", "微商", "QQ", "微信",
];

/// A broken rule. `Display` is the message shown under the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NicknameError {
    #[error("昵称至少需要2个字符")]
    TooShort,
    #[error("昵称最多10个字符")]
    TooLong,
    #[error("昵称只能包含中文、英文、数字、下划线和横线")]
    InvalidCharacters,
    #[error("昵称包含不当内容，请重新输入")]
    Banned,
    #[error("昵称不能全是数字")]
    AllDigits,
    #[error("昵称不能包含3个以上连续相同字符")]
    Repeated,
}

fn allowed_char(c: char) -> bool {
    matches!(c, '\u{4e00}'..='\u{9fa5}' | 'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-')
}

fn has_triple(name: &str) -> bool {
    let chars: Vec<char> = name.chars().collect();
    chars
        .windows(3)
        .any(|w| w[0] == w[1] && w[1] == w[2] && w[0] != '\n')
}

/// Check every rule; an empty list means the name is fine
pub fn violations(nickname: &str) -> Vec<NicknameError> {
    let mut errors = Vec::new();

    if nickname.trim().chars().count() < MIN_LEN {
        errors.push(NicknameError::TooShort);
    }
    if nickname.chars().count() > MAX_LEN {
        errors.push(NicknameError::TooLong);
    }
    if nickname.is_empty() || !nickname.chars().all(allowed_char) {
        errors.push(NicknameError::InvalidCharacters);
    }

    let lower = nickname.to_lowercase();
    if BANNED_WORDS
        .iter()
        .any(|word| lower.contains(&word.to_lowercase()))
    {
        errors.push(NicknameError::Banned);
    }

    if !nickname.is_empty() && nickname.chars().all(|c| c.is_ascii_digit()) {
        errors.push(NicknameError::AllDigits);
    }
    if has_triple(nickname) {
        errors.push(NicknameError::Repeated);
    }
    errors
}

/// First broken rule, if any
pub fn validate(nickname: &str) -> Result<(), NicknameError> {
    match violations(nickname).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["青云子", "snake_king", "a-1", "道友42"] {
            assert_eq!(validate(name), Ok(()), "{name}");
        }
    }

    #[test]
    fn test_length_rules() {
        assert_eq!(violations("a"), vec![NicknameError::TooShort]);
        assert!(violations(" a ").contains(&NicknameError::TooShort));
        assert_eq!(violations("abcdefghijk"), vec![NicknameError::TooLong]);
        // counts characters, not bytes
        assert_eq!(validate("一二三四五六七八九十"), Ok(()));
    }

    #[test]
    fn test_empty_collects_everything_applicable() {
        assert_eq!(
            violations(""),
            vec![NicknameError::TooShort, NicknameError::InvalidCharacters]
        );
    }

    #[test]
    fn test_characters_and_content() {
        assert_eq!(validate("hi there"), Err(NicknameError::InvalidCharacters));
        assert_eq!(validate("加我qq号"), Err(NicknameError::Banned));
        assert_eq!(validate("12345"), Err(NicknameError::AllDigits));
        assert_eq!(validate("aaab"), Err(NicknameError::Repeated));
        assert_eq!(validate("aab"), Ok(()));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(NicknameError::TooShort.to_string(), "昵称至少需要2个字符");
        assert_eq!(
            NicknameError::Repeated.to_string(),
            "昵称不能包含3个以上连续相同字符"
        );
    }
}
