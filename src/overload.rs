//! Signature-based overload resolution (§4.4): a tri-state match result
//! plus the mismatch-kind lattice used to rank partial matches against each
//! other.

use std::sync::Arc;

use crate::model::MethodIdentity;
use crate::typedesc::TypeDescriptor;

/// Per-position (and overall) match outcome. `No` never contributes to a
/// candidate; `Exact` always wins outright; `Maybe` candidates are ranked
/// against each other by [`MismatchKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchResult {
    Exact,
    Maybe(MismatchKind),
    No,
}

/// Ordered worst-to-best only in the sense that a lower [`MismatchKind::rank`]
/// is a closer match; `Exact` is not a variant here because it never needs
/// ranking against another `Maybe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MismatchKind {
    NumericAutoconvert,
    SuperInFormal,
    LibraryTypeFormal,
    LibraryTypeBoth,
    NullTypeFormal,
    NullTypeActual,
    NullTypeBoth,
}

impl MismatchKind {
    /// Lower is a closer match, per the best-match lattice in §4.4.
    pub fn rank(self) -> u8 {
        match self {
            MismatchKind::NumericAutoconvert => 1,
            MismatchKind::SuperInFormal => 2,
            MismatchKind::LibraryTypeFormal => 3,
            MismatchKind::LibraryTypeBoth => 4,
            MismatchKind::NullTypeFormal => 5,
            MismatchKind::NullTypeActual | MismatchKind::NullTypeBoth => 6,
        }
    }
}

/// Matches a single `actual` argument/receiver type against a single
/// `formal` parameter type (§4.4 "Signature matching"). `actual` and
/// `formal` may each be absent when a type could not be computed; `None`
/// on either side degrades to `Maybe(NullType*)` rather than `No`.
pub fn match_type(actual: Option<&dyn TypeDescriptor>, formal: Option<&dyn TypeDescriptor>) -> MatchResult {
    let (actual, formal) = match (actual, formal) {
        (Some(a), Some(f)) => (a, f),
        (None, Some(_)) => return MatchResult::Maybe(MismatchKind::NullTypeActual),
        (Some(_), None) => return MatchResult::Maybe(MismatchKind::NullTypeFormal),
        (None, None) => return MatchResult::Maybe(MismatchKind::NullTypeBoth),
    };

    if actual.is_null_type() {
        return MatchResult::Exact;
    }
    if actual.equals(formal) || actual.erasure().equals(formal.erasure().as_ref()) {
        return MatchResult::Exact;
    }
    if actual.is_array() && formal.is_array() {
        if crate::typedesc::array_element_types_equal(actual, formal) {
            return MatchResult::Exact;
        }
        return MatchResult::No;
    }
    if let (Some(a), Some(f)) = (actual.primitive_numeric_kind(), formal.primitive_numeric_kind()) {
        if a.widens_to(f) {
            return MatchResult::Maybe(MismatchKind::NumericAutoconvert);
        }
        return MatchResult::No;
    }
    if formal.is_universal_top() {
        return MatchResult::Maybe(MismatchKind::SuperInFormal);
    }
    if actual.is_universal_top() {
        return MatchResult::No;
    }
    if actual.matches(formal) {
        return MatchResult::Maybe(MismatchKind::SuperInFormal);
    }
    match (actual.is_library(), formal.is_library()) {
        (false, true) => MatchResult::Maybe(MismatchKind::LibraryTypeFormal),
        (true, true) => MatchResult::Maybe(MismatchKind::LibraryTypeBoth),
        (true, false) => MatchResult::No,
        (false, false) => MatchResult::No,
    }
}

/// Overall verdict for a candidate method against an invocation identity:
/// the worst per-position result (an `Exact` site-list can still end up
/// `Maybe` overall because of a single loose parameter), or `No` the moment
/// any position fails outright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Exact,
    Maybe(MismatchKind),
    No,
}

impl Verdict {
    fn combine(self, other: MatchResult) -> Verdict {
        match (self, other) {
            (Verdict::No, _) | (_, MatchResult::No) => Verdict::No,
            (Verdict::Exact, MatchResult::Exact) => Verdict::Exact,
            (Verdict::Exact, MatchResult::Maybe(k)) => Verdict::Maybe(k),
            (Verdict::Maybe(a), MatchResult::Exact) => Verdict::Maybe(a),
            (Verdict::Maybe(a), MatchResult::Maybe(b)) => {
                if b.rank() > a.rank() {
                    Verdict::Maybe(b)
                } else {
                    Verdict::Maybe(a)
                }
            }
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Verdict::Exact => 0,
            Verdict::Maybe(k) => k.rank(),
            Verdict::No => u8::MAX,
        }
    }
}

/// Matches an invocation identity against a declared candidate's identity,
/// handling the varargs case: a variadic last formal first matches the
/// common prefix, then either a single array actual or the trailing
/// actuals individually against the element type (§4.4 "Varargs").
pub fn best_match(invocation: &MethodIdentity, candidate: &MethodIdentity, candidate_is_varargs: bool) -> Verdict {
    if invocation.name != candidate.name {
        return Verdict::No;
    }

    if candidate_is_varargs && !candidate.param_types.is_empty() {
        let fixed = &candidate.param_types[..candidate.param_types.len() - 1];
        let variadic = candidate.param_types.last().unwrap();
        if invocation.param_types.len() < fixed.len() {
            return Verdict::No;
        }
        let mut verdict = Verdict::Exact;
        for (a, f) in invocation.param_types.iter().zip(fixed.iter()) {
            verdict = verdict.combine(match_type(Some(a.as_ref()), Some(f.as_ref())));
            if verdict == Verdict::No {
                return Verdict::No;
            }
        }
        let trailing = &invocation.param_types[fixed.len()..];
        if trailing.len() == 1 && trailing[0].is_array() {
            verdict = verdict.combine(match_type(Some(trailing[0].as_ref()), Some(variadic.as_ref())));
        } else {
            let element = variadic.array_element();
            for actual in trailing {
                let formal = element.as_deref();
                verdict = verdict.combine(match_type(Some(actual.as_ref()), formal));
                if verdict == Verdict::No {
                    return Verdict::No;
                }
            }
        }
        return verdict;
    }

    if invocation.param_types.len() != candidate.param_types.len() {
        return Verdict::No;
    }
    let mut verdict = Verdict::Exact;
    for (a, f) in invocation.param_types.iter().zip(candidate.param_types.iter()) {
        verdict = verdict.combine(match_type(Some(a.as_ref()), Some(f.as_ref())));
        if verdict == Verdict::No {
            return Verdict::No;
        }
    }
    verdict
}

/// One entry in a best-match search: the candidate method index plus the
/// verdict it earned, the formal types at each position (used to prefer a
/// `SuperInFormal` tie's closer-to-the-actual formal), and whether the
/// candidate itself is a variadic declaration, used for the fixed-arity
/// vs. variable-arity tie-break below (§4.4 "Varargs").
pub struct Candidate<T> {
    pub item: T,
    pub verdict: Verdict,
    pub formal_types: Vec<Arc<dyn TypeDescriptor>>,
    pub is_varargs: bool,
}

/// Picks the best candidate among a set of already-scored candidates:
/// lowest mismatch rank wins. Among ties, a fixed-arity candidate always
/// beats a variable-arity one (Java's two-phase overload resolution: an
/// applicable-without-varargs candidate is chosen before the compiler ever
/// considers a variadic one, so `f(1, arr)` with both `f(int, String[])`
/// and `f(int, String...)` declared picks the non-varargs overload rather
/// than an arbitrary one of two `Exact` matches). Remaining ties among
/// `SuperInFormal` candidates are broken by preferring the formal type that
/// is itself a subtype of the other's formal (closer to the actual),
/// matched position by position.
pub fn select_best<T>(mut candidates: Vec<Candidate<T>>) -> Option<Candidate<T>> {
    candidates.retain(|c| c.verdict != Verdict::No);
    if candidates.is_empty() {
        return None;
    }
    candidates.sort_by_key(|c| c.verdict.rank());
    let best_rank = candidates[0].verdict.rank();
    let mut tied: Vec<_> = candidates
        .into_iter()
        .filter(|c| c.verdict.rank() == best_rank)
        .collect();
    if tied.len() == 1 {
        return tied.pop();
    }
    if tied.iter().any(|c| !c.is_varargs) {
        tied.retain(|c| !c.is_varargs);
    }
    if tied.len() == 1 {
        return tied.pop();
    }
    tied.sort_by(|a, b| {
        for (fa, fb) in a.formal_types.iter().zip(b.formal_types.iter()) {
            if fa.matches(fb.as_ref()) && !fb.matches(fa.as_ref()) {
                return std::cmp::Ordering::Less;
            }
            if fb.matches(fa.as_ref()) && !fa.matches(fb.as_ref()) {
                return std::cmp::Ordering::Greater;
            }
        }
        std::cmp::Ordering::Equal
    });
    tied.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typedesc::PrimitiveNumeric;

    #[derive(Debug)]
    struct Stub {
        name: &'static str,
        is_lib: bool,
        numeric: Option<PrimitiveNumeric>,
        is_top: bool,
        is_null: bool,
    }

    impl TypeDescriptor for Stub {
        fn name(&self) -> &str {
            self.name
        }
        fn erasure(&self) -> Arc<dyn TypeDescriptor> {
            Arc::new(Stub {
                name: self.name,
                is_lib: self.is_lib,
                numeric: self.numeric,
                is_top: self.is_top,
                is_null: self.is_null,
            })
        }
        fn matches(&self, other: &dyn TypeDescriptor) -> bool {
            self.name == other.name()
        }
        fn is_library(&self) -> bool {
            self.is_lib
        }
        fn is_null_type(&self) -> bool {
            self.is_null
        }
        fn is_universal_top(&self) -> bool {
            self.is_top
        }
        fn primitive_numeric_kind(&self) -> Option<PrimitiveNumeric> {
            self.numeric
        }
    }

    fn stub(name: &'static str) -> Stub {
        Stub {
            name,
            is_lib: false,
            numeric: None,
            is_top: false,
            is_null: false,
        }
    }

    #[test]
    fn identical_names_match_exact() {
        let a = stub("Foo");
        let f = stub("Foo");
        assert_eq!(match_type(Some(&a), Some(&f)), MatchResult::Exact);
    }

    #[test]
    fn numeric_widening_is_maybe() {
        let a = Stub {
            numeric: Some(PrimitiveNumeric::Int),
            ..stub("int")
        };
        let f = Stub {
            numeric: Some(PrimitiveNumeric::Long),
            ..stub("long")
        };
        assert_eq!(
            match_type(Some(&a), Some(&f)),
            MatchResult::Maybe(MismatchKind::NumericAutoconvert)
        );
    }

    #[test]
    fn null_literal_matches_anything_exact() {
        let a = Stub {
            is_null: true,
            ..stub("null")
        };
        let f = stub("Foo");
        assert_eq!(match_type(Some(&a), Some(&f)), MatchResult::Exact);
    }

    #[test]
    fn library_actual_against_source_formal_is_no() {
        let a = Stub {
            is_lib: true,
            ..stub("java.util.List")
        };
        let f = stub("com.example.Widget");
        assert_eq!(match_type(Some(&a), Some(&f)), MatchResult::No);
    }

    #[test]
    fn source_actual_against_library_formal_is_maybe() {
        let a = stub("com.example.Widget");
        let f = Stub {
            is_lib: true,
            ..stub("java.util.List")
        };
        assert_eq!(
            match_type(Some(&a), Some(&f)),
            MatchResult::Maybe(MismatchKind::LibraryTypeFormal)
        );
    }

    #[test]
    fn missing_types_degrade_to_null_maybe_not_error() {
        assert_eq!(
            match_type(None, Some(&stub("Foo"))),
            MatchResult::Maybe(MismatchKind::NullTypeActual)
        );
        assert_eq!(
            match_type(Some(&stub("Foo")), None),
            MatchResult::Maybe(MismatchKind::NullTypeFormal)
        );
    }
}
