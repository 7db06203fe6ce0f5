//! Storage prefixes for newer ("future") functions
//!
//! Functions added after the original file format are stored as
//! `_xlfn.NAME(...)` so older readers know they cannot evaluate them.
//! [`FutureFunctions::normalize`] adds the prefix to authored text and
//! [`FutureFunctions::strip_prefixes`] removes it again.

use crate::ast::ReferenceStyle;
use crate::parser::strip_future_prefix;
use crate::rewrite::{rewrite_formula, FormulaVisitor, NameRewriteVisitor, RewriteContext};
use crate::trie::PrefixTrie;
use gridcalc_core::CellOrigin;
use once_cell::sync::Lazy;
use std::borrow::Cow;

const XL_FN_PREFIX: &str = "_xlfn.";
const XL_WS_PREFIX: &str = "_xlws.";

/// Functions stored in the worksheet namespace as well (`_xlfn._xlws.`)
const WORKSHEET_NAMESPACE: &[&str] = &["FILTER", "SORT"];

// Sorted (ASCII)
const FUTURE_FUNCTIONS: &[&str] = &[
    "ACOT",
    "ACOTH",
    "AGGREGATE",
    "ARABIC",
    "BASE",
    "BETA.DIST",
    "BETA.INV",
    "BINOM.DIST",
    "BINOM.DIST.RANGE",
    "BINOM.INV",
    "BITAND",
    "BITLSHIFT",
    "BITOR",
    "BITRSHIFT",
    "BITXOR",
    "BYCOL",
    "BYROW",
    "CEILING.MATH",
    "CEILING.PRECISE",
    "CHISQ.DIST",
    "CHISQ.DIST.RT",
    "CHISQ.INV",
    "CHISQ.INV.RT",
    "CHISQ.TEST",
    "CHOOSECOLS",
    "CHOOSEROWS",
    "COMBINA",
    "CONCAT",
    "CONFIDENCE.NORM",
    "CONFIDENCE.T",
    "COT",
    "COTH",
    "COVARIANCE.P",
    "COVARIANCE.S",
    "CSC",
    "CSCH",
    "DAYS",
    "DECIMAL",
    "DROP",
    "EXPAND",
    "EXPON.DIST",
    "F.DIST",
    "F.DIST.RT",
    "F.INV",
    "F.INV.RT",
    "F.TEST",
    "FILTER",
    "FLOOR.MATH",
    "FLOOR.PRECISE",
    "FORECAST.ETS",
    "FORECAST.ETS.CONFINT",
    "FORECAST.ETS.SEASONALITY",
    "FORECAST.ETS.STAT",
    "FORECAST.LINEAR",
    "FORMULATEXT",
    "GAMMA",
    "GAMMA.DIST",
    "GAMMA.INV",
    "GAMMALN.PRECISE",
    "GAUSS",
    "HSTACK",
    "HYPGEOM.DIST",
    "IFNA",
    "IFS",
    "IMAGE",
    "ISFORMULA",
    "ISO.CEILING",
    "ISOMITTED",
    "ISOWEEKNUM",
    "LAMBDA",
    "LET",
    "LOGNORM.DIST",
    "LOGNORM.INV",
    "MAKEARRAY",
    "MAP",
    "MAXIFS",
    "MINIFS",
    "MODE.MULT",
    "MODE.SNGL",
    "MUNIT",
    "NEGBINOM.DIST",
    "NETWORKDAYS.INTL",
    "NORM.DIST",
    "NORM.INV",
    "NORM.S.DIST",
    "NORM.S.INV",
    "NUMBERVALUE",
    "PDURATION",
    "PERCENTILE.EXC",
    "PERCENTILE.INC",
    "PERCENTRANK.EXC",
    "PERCENTRANK.INC",
    "PERMUTATIONA",
    "PHI",
    "POISSON.DIST",
    "QUARTILE.EXC",
    "QUARTILE.INC",
    "RANDARRAY",
    "RANK.AVG",
    "RANK.EQ",
    "REDUCE",
    "RRI",
    "SCAN",
    "SEC",
    "SECH",
    "SEQUENCE",
    "SHEET",
    "SHEETS",
    "SKEW.P",
    "SORT",
    "SORTBY",
    "STDEV.P",
    "STDEV.S",
    "SWITCH",
    "T.DIST",
    "T.DIST.2T",
    "T.DIST.RT",
    "T.INV",
    "T.INV.2T",
    "T.TEST",
    "TAKE",
    "TEXTAFTER",
    "TEXTBEFORE",
    "TEXTJOIN",
    "TEXTSPLIT",
    "TOCOL",
    "TOROW",
    "UNICHAR",
    "UNICODE",
    "UNIQUE",
    "VALUETOTEXT",
    "VAR.P",
    "VAR.S",
    "VSTACK",
    "WEIBULL.DIST",
    "WORKDAY.INTL",
    "WRAPCOLS",
    "WRAPROWS",
    "XLOOKUP",
    "XMATCH",
    "XOR",
    "Z.TEST",
];

static DEFAULT: Lazy<FutureFunctions> = Lazy::new(|| FutureFunctions::new(FUTURE_FUNCTIONS));

/// The stored form of a future function name
fn stored_name(name: &str) -> String {
    let upper = name.to_uppercase();
    if WORKSHEET_NAMESPACE.contains(&upper.as_str()) {
        format!("{}{}{}", XL_FN_PREFIX, XL_WS_PREFIX, upper)
    } else {
        format!("{}{}", XL_FN_PREFIX, upper)
    }
}

/// Removes storage prefixes from function calls
struct PrefixStripVisitor;

impl FormulaVisitor for PrefixStripVisitor {
    fn function_name(&mut self, name: &str, _ctx: &RewriteContext) -> Option<String> {
        strip_future_prefix(name).map(str::to_string)
    }
}

/// A set of future function names with their stored forms
#[derive(Debug, Clone)]
pub struct FutureFunctions {
    trie: PrefixTrie,
    names: NameRewriteVisitor,
}

impl FutureFunctions {
    /// Build from a list of bare names
    ///
    /// # Panics
    ///
    /// If a name contains characters other than letters, digits, `.` or `_`.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        let trie = PrefixTrie::build(names.iter().map(AsRef::as_ref));
        let names =
            NameRewriteVisitor::new(names.iter().map(|n| (n.as_ref(), stored_name(n.as_ref()))));
        Self { trie, names }
    }

    /// The built-in future function list
    pub fn builtin() -> &'static FutureFunctions {
        &DEFAULT
    }

    /// Add storage prefixes to future function calls in A1 formula text
    ///
    /// Text with no future name anywhere in it, or with nothing to rewrite,
    /// comes back borrowed. Text that cannot be tokenized also comes back
    /// unchanged.
    pub fn normalize<'t>(&self, text: &'t str, origin: &CellOrigin) -> Cow<'t, str> {
        if !self.trie.occurs_in(text) {
            return Cow::Borrowed(text);
        }
        let ctx = RewriteContext::new(ReferenceStyle::A1, *origin);
        match rewrite_formula(text, &ctx, &mut &self.names) {
            Ok(rewritten) if rewritten.changed => {
                log::debug!("normalized future functions: {} -> {}", text, rewritten.text);
                Cow::Owned(rewritten.text)
            }
            Ok(_) => Cow::Borrowed(text),
            Err(e) => {
                log::warn!("cannot normalize future functions in {:?}: {}", text, e);
                Cow::Borrowed(text)
            }
        }
    }

    /// Remove `_xlfn.` / `_xlws.` prefixes from function calls
    pub fn strip_prefixes<'t>(&self, text: &'t str, origin: &CellOrigin) -> Cow<'t, str> {
        if !text.to_ascii_lowercase().contains(XL_FN_PREFIX) {
            return Cow::Borrowed(text);
        }
        let ctx = RewriteContext::new(ReferenceStyle::A1, *origin);
        match rewrite_formula(text, &ctx, &mut PrefixStripVisitor) {
            Ok(rewritten) if rewritten.changed => Cow::Owned(rewritten.text),
            Ok(_) => Cow::Borrowed(text),
            Err(e) => {
                log::warn!("cannot strip function prefixes in {:?}: {}", text, e);
                Cow::Borrowed(text)
            }
        }
    }
}

/// Normalize with the built-in list
pub fn normalize_future_functions<'t>(text: &'t str, origin: &CellOrigin) -> Cow<'t, str> {
    FutureFunctions::builtin().normalize(text, origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalize(text: &str) -> Cow<'_, str> {
        normalize_future_functions(text, &CellOrigin::default())
    }

    #[test]
    fn test_normalize_adds_prefix() {
        assert_eq!(normalize("=concat(A1,B1)"), "=_xlfn.CONCAT(A1,B1)");
        assert_eq!(
            normalize("=SUM(1)+Xlookup(1,A:A,B:B)"),
            "=SUM(1)+_xlfn.XLOOKUP(1,A:A,B:B)"
        );
        assert_eq!(normalize("=FILTER(A1:A9,B1:B9)"), "=_xlfn._xlws.FILTER(A1:A9,B1:B9)");
        assert_eq!(normalize("=NORM.S.DIST(0,TRUE)"), "=_xlfn.NORM.S.DIST(0,TRUE)");
    }

    #[test]
    fn test_normalize_identity_is_borrowed() {
        assert!(matches!(normalize("=SUM(A1:A3)"), Cow::Borrowed(_)));
        // Mentions but no calls
        assert!(matches!(normalize("=\"CONCAT(\"&CONCATENATE(A1)"), Cow::Borrowed(_)));
        assert!(matches!(normalize("=_xlfn.CONCAT(A1)"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("=IFS(A1>0,SEQUENCE(3),TRUE,0)").into_owned();
        assert_eq!(once, "=_xlfn.IFS(A1>0,_xlfn.SEQUENCE(3),TRUE,0)");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_normalize_every_future_function() {
        for name in FUTURE_FUNCTIONS {
            let stored = format!("=1+{}(A1)", stored_name(name));
            for written in [name.to_string(), name.to_lowercase()] {
                let once = normalize(&format!("=1+{}(A1)", written)).into_owned();
                assert_eq!(once, stored);
                assert!(matches!(normalize(&once), Cow::Borrowed(t) if t == once));
            }
        }
    }

    #[test]
    fn test_normalize_untokenizable_text_is_unchanged() {
        let text = "=CONCAT(\"open";
        assert!(matches!(normalize(text), Cow::Borrowed(t) if t == text));
    }

    #[test]
    fn test_strip_prefixes() {
        let future = FutureFunctions::builtin();
        let origin = CellOrigin::default();
        assert_eq!(
            future.strip_prefixes("=_xlfn._xlws.SORT(A1:A3)+_XLFN.CONCAT(\"_xlfn.\")", &origin),
            "=SORT(A1:A3)+CONCAT(\"_xlfn.\")"
        );
        assert!(matches!(future.strip_prefixes("=SUM(1)", &origin), Cow::Borrowed(_)));
    }

    #[test]
    fn test_custom_list() {
        let future = FutureFunctions::new(&["MYFN"]);
        let origin = CellOrigin::default();
        assert_eq!(future.normalize("myfn(1)", &origin), "_xlfn.MYFN(1)");
        assert_eq!(future.normalize("CONCAT(1)", &origin), "CONCAT(1)");
    }
}
