/// 人类可读名称到 Yahoo 代码的固定映射
const YAHOO_ALIASES: &[(&str, &str)] = &[
    ("XAUUSD", "GC=F"),
    ("XAGUSD", "SI=F"),
    ("GER40", "^GDAXI"),
    ("USOIL", "CL=F"),
    ("UKOIL", "BZ=F"),
    ("NAS100", "QQQ"),
    ("US30", "^DJI"),
    ("US500", "^GSPC"),
];

/// # Summary
/// 将人类可读的标的名称转换为 Yahoo Finance 代码。
///
/// # Logic
/// 1. 去空白并转大写 ("US 500" → "US500")。
/// 2. 已经是 Yahoo 格式 (含 `=` 或以 `^` 开头) 的直接返回。
/// 3. 命中固定映射表则返回映射值。
/// 4. 6 位纯字母视为外汇对，追加 `=X`。
/// 5. 其余 (股票、ETF) 原样返回。
pub fn to_yahoo_symbol(name: &str) -> String {
    let key: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    if key.contains('=') || key.starts_with('^') {
        return key;
    }
    if let Some((_, mapped)) = YAHOO_ALIASES.iter().find(|(alias, _)| *alias == key) {
        return (*mapped).to_string();
    }
    if key.len() == 6 && key.chars().all(|c| c.is_ascii_alphabetic()) {
        return format!("{}=X", key);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_table() {
        assert_eq!(to_yahoo_symbol("XAUUSD"), "GC=F");
        assert_eq!(to_yahoo_symbol("us 500"), "^GSPC");
        assert_eq!(to_yahoo_symbol("NAS100"), "QQQ");
        assert_eq!(to_yahoo_symbol("GER40"), "^GDAXI");
    }

    #[test]
    fn test_forex_pairs_get_suffix() {
        assert_eq!(to_yahoo_symbol("EURUSD"), "EURUSD=X");
        assert_eq!(to_yahoo_symbol("gbpjpy"), "GBPJPY=X");
        assert_eq!(to_yahoo_symbol("EURUSD=X"), "EURUSD=X");
    }

    #[test]
    fn test_stocks_pass_through() {
        assert_eq!(to_yahoo_symbol("AAPL"), "AAPL");
        assert_eq!(to_yahoo_symbol("^DJI"), "^DJI");
        assert_eq!(to_yahoo_symbol("GC=F"), "GC=F");
    }
}
