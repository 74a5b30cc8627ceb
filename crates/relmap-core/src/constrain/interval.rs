//! Open/closed intervals over conformed literals.

use relmap_primitives::Literal;
use std::cmp::Ordering;

///
/// Endpoint
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Endpoint {
    pub value: Literal,
    pub inclusive: bool,
}

///
/// Interval
///
/// `None` endpoints are unbounded. All values inserted into one interval
/// share the field's storage family, so literal ordering is total.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Interval {
    pub lo: Option<Endpoint>,
    pub hi: Option<Endpoint>,
}

impl Interval {
    #[must_use]
    pub const fn full() -> Self {
        Self { lo: None, hi: None }
    }

    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.lo.is_none() && self.hi.is_none()
    }

    /// Raise the lower bound if the new one is tighter.
    pub fn tighten_lo(&mut self, value: Literal, inclusive: bool) {
        let tighter = match &self.lo {
            None => true,
            Some(existing) => match value.cmp(&existing.value) {
                Ordering::Greater => true,
                Ordering::Equal => existing.inclusive && !inclusive,
                Ordering::Less => false,
            },
        };
        if tighter {
            self.lo = Some(Endpoint { value, inclusive });
        }
    }

    /// Lower the upper bound if the new one is tighter.
    pub fn tighten_hi(&mut self, value: Literal, inclusive: bool) {
        let tighter = match &self.hi {
            None => true,
            Some(existing) => match value.cmp(&existing.value) {
                Ordering::Less => true,
                Ordering::Equal => existing.inclusive && !inclusive,
                Ordering::Greater => false,
            },
        };
        if tighter {
            self.hi = Some(Endpoint { value, inclusive });
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match (&self.lo, &self.hi) {
            (Some(lo), Some(hi)) => match lo.value.cmp(&hi.value) {
                Ordering::Greater => true,
                Ordering::Equal => !(lo.inclusive && hi.inclusive),
                Ordering::Less => false,
            },
            _ => false,
        }
    }

    #[must_use]
    pub fn contains(&self, value: &Literal) -> bool {
        if let Some(lo) = &self.lo {
            match value.cmp(&lo.value) {
                Ordering::Less => return false,
                Ordering::Equal if !lo.inclusive => return false,
                _ => {}
            }
        }
        if let Some(hi) = &self.hi {
            match value.cmp(&hi.value) {
                Ordering::Greater => return false,
                Ordering::Equal if !hi.inclusive => return false,
                _ => {}
            }
        }
        true
    }

    /// Exclude a single value: endpoint hits turn the endpoint exclusive,
    /// interior values are left for the caller's residual set.
    pub fn exclude_endpoint(&mut self, value: &Literal) -> bool {
        if let Some(lo) = &mut self.lo
            && lo.inclusive
            && lo.value == *value
        {
            lo.inclusive = false;
            return true;
        }
        if let Some(hi) = &mut self.hi
            && hi.inclusive
            && hi.value == *value
        {
            hi.inclusive = false;
            return true;
        }
        false
    }

    /// Render like `(10, 5)` or `[0, *)` for error reports.
    #[must_use]
    pub fn render(&self) -> String {
        let (open, lo) = match &self.lo {
            Some(e) => (if e.inclusive { '[' } else { '(' }, e.value.to_string()),
            None => ('(', "*".to_string()),
        };
        let (close, hi) = match &self.hi {
            Some(e) => (if e.inclusive { ']' } else { ')' }, e.value.to_string()),
            None => (')', "*".to_string()),
        };
        format!("{open}{lo}, {hi}{close}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tightening_keeps_the_narrower_bound() {
        let mut interval = Interval::full();
        interval.tighten_lo(Literal::Int(1), true);
        interval.tighten_lo(Literal::Int(5), false);
        interval.tighten_lo(Literal::Int(3), true);

        assert_eq!(
            interval.lo,
            Some(Endpoint {
                value: Literal::Int(5),
                inclusive: false
            })
        );
    }

    #[test]
    fn disjoint_bounds_empty_the_interval() {
        let mut interval = Interval::full();
        interval.tighten_lo(Literal::Int(10), false);
        interval.tighten_hi(Literal::Int(5), false);

        assert!(interval.is_empty());
        assert_eq!(interval.render(), "(10, 5)");
    }

    #[test]
    fn equal_bounds_need_both_ends_inclusive() {
        let mut closed = Interval::full();
        closed.tighten_lo(Literal::Int(5), true);
        closed.tighten_hi(Literal::Int(5), true);
        assert!(!closed.is_empty());
        assert!(closed.contains(&Literal::Int(5)));

        let mut half_open = Interval::full();
        half_open.tighten_lo(Literal::Int(5), true);
        half_open.tighten_hi(Literal::Int(5), false);
        assert!(half_open.is_empty());
    }

    #[test]
    fn excluding_an_inclusive_endpoint_makes_it_exclusive() {
        let mut interval = Interval::full();
        interval.tighten_lo(Literal::Int(1), true);
        interval.tighten_hi(Literal::Int(10), true);

        assert!(interval.exclude_endpoint(&Literal::Int(10)));
        assert!(!interval.contains(&Literal::Int(10)));
        assert!(!interval.exclude_endpoint(&Literal::Int(5)));
    }

    #[test]
    fn renders_mixed_bounds() {
        let mut interval = Interval::full();
        interval.tighten_lo(Literal::Int(0), true);
        assert_eq!(interval.render(), "[0, *)");
    }
}
