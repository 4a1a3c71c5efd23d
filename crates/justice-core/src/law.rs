//! Kenyan legal reference material shown alongside analyses.

use crate::incident::Classification;

/// Statutes the guidance draws on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statute {
    EmploymentAct,
    Constitution,
    SexualOffencesAct,
}

impl Statute {
    pub const ALL: [Statute; 3] = [
        Self::EmploymentAct,
        Self::Constitution,
        Self::SexualOffencesAct,
    ];

    pub fn citation(&self) -> &'static str {
        match self {
            Self::EmploymentAct => "Employment Act, 2007, s. 6",
            Self::Constitution => "Constitution of Kenya, Art. 27",
            Self::SexualOffencesAct => "Sexual Offences Act, 2006",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            Self::EmploymentAct => {
                "Under Section 6 of the Kenyan Employment Act (2007), every employee is entitled \
                 to a workplace free from sexual harassment."
            }
            Self::Constitution => {
                "Article 27 of the Constitution of Kenya guarantees the right to equality and \
                 freedom from discrimination on any grounds."
            }
            Self::SexualOffencesAct => {
                "The Sexual Offences Act (2006) provides legal frameworks for addressing \
                 non-consensual sexual acts and harassment."
            }
        }
    }
}

/// Statutes worth pointing at for a set of classifications, in citation order.
pub fn relevant_statutes(classifications: &[Classification]) -> Vec<Statute> {
    let mut out = Vec::new();
    for statute in Statute::ALL {
        let applies = classifications.iter().any(|c| match (statute, c) {
            (Statute::EmploymentAct, _) => true,
            (Statute::Constitution, Classification::Discrimination) => true,
            (Statute::SexualOffencesAct, Classification::SexualHarassment) => true,
            _ => false,
        });
        if applies {
            out.push(statute);
        }
    }
    out
}

/// Dashboard documentation tips.
pub const DOCUMENTATION_TIPS: &[&str] = &[
    "Document incidents as soon as possible.",
    "Use observable facts.",
];

pub const DISCLAIMER: &str = "This information is for educational purposes and does not \
constitute legal advice. Justice is not a legal representative.";
