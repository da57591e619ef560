//! Static condition to content table
//!
//! Each entry lists the labels it answers to (the service spells eczema as
//! `Eczemaa`), followed by its recommendations and products. Lookups that
//! match no entry fall back to [`DEFAULT_CONTENT`].

/// Static product row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductEntry {
    pub name: &'static str,
    pub brand: &'static str,
    pub rating: f64,
    pub price: &'static str,
}

/// Content attached to one condition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionContent {
    pub names: &'static [&'static str],
    pub recommendations: &'static [&'static str],
    pub products: &'static [ProductEntry],
}

/// Returned for any condition not present in [`CONDITION_CATALOG`]
pub static DEFAULT_CONTENT: ConditionContent = ConditionContent {
    names: &[],
    recommendations: &[
        "Consult with a healthcare professional",
        "Monitor for any changes in symptoms",
        "Maintain good skincare practices",
    ],
    products: &[
        ProductEntry {
            name: "Hydrating Daily Moisturizer",
            brand: "CeraVe",
            rating: 4.8,
            price: "$12.99",
        },
        ProductEntry {
            name: "Gentle Foaming Cleanser",
            brand: "Neutrogena",
            rating: 4.6,
            price: "$8.99",
        },
        ProductEntry {
            name: "Vitamin C Serum",
            brand: "The Ordinary",
            rating: 4.7,
            price: "$15.50",
        },
    ],
};

pub static CONDITION_CATALOG: &[ConditionContent] = &[
    ConditionContent {
        names: &["Acne"],
        recommendations: &[
            "Cleanse twice daily with a gentle, non-comedogenic cleanser",
            "Use topical treatments containing benzoyl peroxide or salicylic acid",
            "Avoid picking or squeezing lesions to prevent scarring",
            "Consult a dermatologist if acne persists or leaves scars",
        ],
        products: &[
            ProductEntry {
                name: "Acne Foaming Cream Cleanser",
                brand: "CeraVe",
                rating: 4.6,
                price: "$14.99",
            },
            ProductEntry {
                name: "Effaclar Duo Acne Spot Treatment",
                brand: "La Roche-Posay",
                rating: 4.5,
                price: "$29.99",
            },
            ProductEntry {
                name: "Niacinamide 10% + Zinc 1%",
                brand: "The Ordinary",
                rating: 4.4,
                price: "$6.00",
            },
        ],
    },
    ConditionContent {
        names: &["Actinic Keratosis"],
        recommendations: &[
            "Schedule a dermatologist evaluation of the affected area",
            "Apply a broad-spectrum SPF 30+ sunscreen every day",
            "Wear protective clothing and avoid peak sun hours",
            "Watch lesions for growth, bleeding or tenderness",
        ],
        products: &[
            ProductEntry {
                name: "Anthelios Melt-in Milk Sunscreen SPF 60",
                brand: "La Roche-Posay",
                rating: 4.7,
                price: "$36.99",
            },
            ProductEntry {
                name: "UV Clear Broad-Spectrum SPF 46",
                brand: "EltaMD",
                rating: 4.8,
                price: "$41.00",
            },
            ProductEntry {
                name: "Healing Ointment",
                brand: "CeraVe",
                rating: 4.7,
                price: "$13.99",
            },
        ],
    },
    ConditionContent {
        names: &["Basal Cell Carcinoma"],
        recommendations: &[
            "Seek prompt dermatologist evaluation and biopsy",
            "Protect the affected area from further sun exposure",
            "Apply a broad-spectrum SPF 50+ sunscreen every day",
            "Perform monthly skin self-examinations",
        ],
        products: &[
            ProductEntry {
                name: "Anthelios Mineral Sunscreen SPF 50",
                brand: "La Roche-Posay",
                rating: 4.6,
                price: "$33.99",
            },
            ProductEntry {
                name: "UV Physical Broad-Spectrum SPF 41",
                brand: "EltaMD",
                rating: 4.7,
                price: "$39.00",
            },
            ProductEntry {
                name: "Sensitive Skin Mineral Sunscreen SPF 50",
                brand: "Vanicream",
                rating: 4.5,
                price: "$15.99",
            },
        ],
    },
    ConditionContent {
        names: &["Eczemaa", "Eczema"],
        recommendations: &[
            "Moisturize at least twice daily with a fragrance-free emollient",
            "Bathe in lukewarm water with a soap-free cleanser",
            "Identify and avoid personal triggers such as wool or harsh detergents",
            "Ask a healthcare provider about topical anti-inflammatory treatment",
        ],
        products: &[
            ProductEntry {
                name: "Eczema Therapy Moisturizing Cream",
                brand: "Aveeno",
                rating: 4.7,
                price: "$12.49",
            },
            ProductEntry {
                name: "Lipikar Balm AP+",
                brand: "La Roche-Posay",
                rating: 4.7,
                price: "$31.99",
            },
            ProductEntry {
                name: "Moisturizing Cream",
                brand: "Vanicream",
                rating: 4.8,
                price: "$13.99",
            },
        ],
    },
    ConditionContent {
        names: &["Rosacea"],
        recommendations: &[
            "Identify and avoid triggers such as spicy food, alcohol and heat",
            "Use gentle, fragrance-free skincare products",
            "Apply a mineral sunscreen every day",
            "Consult a dermatologist about prescription topical therapy",
        ],
        products: &[
            ProductEntry {
                name: "Toleriane Double Repair Face Moisturizer",
                brand: "La Roche-Posay",
                rating: 4.6,
                price: "$21.99",
            },
            ProductEntry {
                name: "Cicapair Tiger Grass Color Correcting Treatment",
                brand: "Dr. Jart+",
                rating: 4.4,
                price: "$52.00",
            },
            ProductEntry {
                name: "Azelaic Acid Suspension 10%",
                brand: "The Ordinary",
                rating: 4.3,
                price: "$12.90",
            },
        ],
    },
];

/// Look up the content for `condition`, falling back to [`DEFAULT_CONTENT`]
#[must_use]
pub fn lookup(condition: &str) -> &'static ConditionContent {
    CONDITION_CATALOG
        .iter()
        .find(|entry| entry.names.iter().any(|name| *name == condition))
        .unwrap_or(&DEFAULT_CONTENT)
}

/// All labels with dedicated content
pub fn known_conditions() -> impl Iterator<Item = &'static str> {
    CONDITION_CATALOG
        .iter()
        .flat_map(|entry| entry.names.iter().copied())
}
