//! Built-in rubric for the Senior Finance role the platform was first tuned for.

use std::collections::BTreeMap;

use crate::rubric::models::{
    CategoryConfig, CategoryKey, IndustryTier, InferenceConfig, ScoringConfig,
};

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

pub fn potential_expected() -> u32 {
    4
}

pub fn inference() -> InferenceConfig {
    InferenceConfig {
        corporate_scope_keywords: words(&[
            "regional",
            "latam",
            "global",
            "multinacional",
            "holding",
            "filiales",
            "m&a",
            "ipo",
            "apertura en bolsa",
            "billones",
            "mmus$",
            "corporate",
            "directorio",
            "gobernanza",
        ]),
        potential_keywords: words(&[
            "aprendizaje",
            "autodidacta",
            "adaptación",
            "flexible",
            "polifuncional",
            "innovación",
            "tecnología",
            "growth",
        ]),
        potential_expected: potential_expected(),
    }
}

pub fn industry_keywords() -> BTreeMap<IndustryTier, Vec<String>> {
    BTreeMap::from([
        (
            IndustryTier::Fintech,
            words(&["fintech", "fintoc", "mercadopago", "rappi", "klarna", "stripe"]),
        ),
        (
            IndustryTier::Tech,
            words(&["startup", "software", "saas", "platform"]),
        ),
        (
            IndustryTier::Traditional,
            words(&["minería", "construcción", "educación", "retail", "manufactura"]),
        ),
    ])
}

pub fn industry_multipliers() -> BTreeMap<IndustryTier, f64> {
    BTreeMap::from([
        (IndustryTier::Fintech, 1.5),
        (IndustryTier::Tech, 1.2),
        (IndustryTier::General, 1.0),
        (IndustryTier::Traditional, 0.7),
    ])
}

pub fn scoring_config() -> ScoringConfig {
    let categories = BTreeMap::from([
        (
            CategoryKey::Admin,
            CategoryConfig {
                name: "Admin & Finanzas".to_string(),
                keywords: words(&[
                    "cierre contable",
                    "mensual",
                    "imputación",
                    "gastos",
                    "ingresos",
                    "reportes financieros",
                    "análisis de cuentas",
                    "excel",
                    "trazabilidad",
                    "contratos",
                    "auditoría",
                    "estados financieros",
                    "contabilidad",
                    "balance",
                    "control administrativo",
                    "procedimientos",
                    "normativa",
                ]),
            },
        ),
        (
            CategoryKey::Ops,
            CategoryConfig {
                name: "Operaciones y Tesorería".to_string(),
                keywords: words(&[
                    "flujo de caja",
                    "cash flow",
                    "semanal",
                    "proyección",
                    "liquidez",
                    "priorizar pagos",
                    "tesorería",
                    "banco",
                    "transferencias",
                    "conciliación bancaria",
                    "contingencias",
                    "pagos",
                    "operaciones financieras",
                    "clearing",
                    "recaudación",
                ]),
            },
        ),
        (
            CategoryKey::Biz,
            CategoryConfig {
                name: "Growth & Cultura".to_string(),
                keywords: words(&[
                    "procesos",
                    "implementación",
                    "mejora continua",
                    "liderazgo",
                    "equipo",
                    "autonomía",
                    "proactividad",
                    "business intelligence",
                    "automatización",
                    "eficiencia",
                    "escalable",
                    "estrategia",
                    "kpi",
                    "growth",
                    "ownership",
                    "colaboración",
                    "user-centric",
                ]),
            },
        ),
    ]);

    ScoringConfig {
        categories,
        industry_multipliers: industry_multipliers(),
        inference: inference(),
        industry_keywords: industry_keywords(),
    }
}
