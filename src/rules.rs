//! Declarative credit-classification rules.
//!
//! Each bucket is defined by a conjunction of clauses, and each clause is an
//! exact-membership test of one ticket field against a fixed set of
//! categorical codes. The rule set lives in one table (`RULES`) so a rule can
//! be read, audited, and unit-tested without chasing conditional branches.

/// The five named credit counters a ticket can be classified into.
///
/// Membership predicates are independent: a ticket may match zero, one, or
/// several buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    TotalAvailable,
    ExtendedPlacement,
    TotalPurchased,
    DealAvailable,
    DealPurchased,
}

impl Bucket {
    /// All buckets, in table order. Used to size and index per-bucket arrays.
    pub const ALL: [Bucket; 5] = [
        Bucket::TotalAvailable,
        Bucket::ExtendedPlacement,
        Bucket::TotalPurchased,
        Bucket::DealAvailable,
        Bucket::DealPurchased,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Stable index of this bucket within [`Bucket::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bucket::TotalAvailable => write!(f, "total-available"),
            Bucket::ExtendedPlacement => write!(f, "extended-placement"),
            Bucket::TotalPurchased => write!(f, "total-purchased"),
            Bucket::DealAvailable => write!(f, "deal-available"),
            Bucket::DealPurchased => write!(f, "deal-purchased"),
        }
    }
}

/// The three ticket fields a clause can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketField {
    Pipeline,
    PipelineStage,
    ProductId,
}

/// One clause: the named field's value must be a member of `codes`.
#[derive(Debug, Clone, Copy)]
pub struct Clause {
    pub field: TicketField,
    pub codes: &'static [&'static str],
}

impl Clause {
    fn matches(&self, pipeline: &str, stage: &str, product: &str) -> bool {
        let value = match self.field {
            TicketField::Pipeline => pipeline,
            TicketField::PipelineStage => stage,
            TicketField::ProductId => product,
        };
        self.codes.contains(&value)
    }
}

/// A bucket's full membership rule: every clause must hold.
#[derive(Debug, Clone, Copy)]
pub struct BucketRule {
    pub bucket: Bucket,
    pub clauses: &'static [Clause],
}

impl BucketRule {
    /// Evaluate this rule against a ticket's three categorical fields.
    pub fn matches(&self, pipeline: &str, stage: &str, product: &str) -> bool {
        self.clauses.iter().all(|c| c.matches(pipeline, stage, product))
    }
}

/// The complete rule table. Codes are the CRM's categorical identifiers for
/// pipelines, pipeline stages, and product lines.
pub const RULES: [BucketRule; Bucket::COUNT] = [
    BucketRule {
        bucket: Bucket::TotalAvailable,
        clauses: &[
            Clause { field: TicketField::PipelineStage, codes: &["61272329"] },
            Clause { field: TicketField::ProductId, codes: &["3652447404", "3299780235"] },
        ],
    },
    BucketRule {
        bucket: Bucket::ExtendedPlacement,
        clauses: &[
            Clause { field: TicketField::PipelineStage, codes: &["61272329", "32383830"] },
            Clause {
                field: TicketField::ProductId,
                codes: &["3612186226", "3658554544", "3632264778", "3653366158"],
            },
        ],
    },
    BucketRule {
        bucket: Bucket::TotalPurchased,
        clauses: &[
            Clause { field: TicketField::Pipeline, codes: &["11082157"] },
            Clause { field: TicketField::ProductId, codes: &["3652447404", "3299780235"] },
        ],
    },
    BucketRule {
        bucket: Bucket::DealAvailable,
        clauses: &[
            Clause { field: TicketField::PipelineStage, codes: &["61272329"] },
            Clause { field: TicketField::ProductId, codes: &["3299780235", "3294111583"] },
        ],
    },
    BucketRule {
        bucket: Bucket::DealPurchased,
        clauses: &[
            Clause { field: TicketField::Pipeline, codes: &["11082157"] },
            Clause { field: TicketField::ProductId, codes: &["3299780235", "3294111583"] },
        ],
    },
];

/// Look up a single bucket's rule in the table.
pub fn rule_for(bucket: Bucket) -> &'static BucketRule {
    &RULES[bucket.index()]
}
