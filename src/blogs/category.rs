use serde::{Deserialize, Serialize};

/// Fixed set of blog categories, stored as the Postgres enum `blog_category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "blog_category")]
pub enum Category {
    #[serde(rename = "Technology")]
    #[sqlx(rename = "Technology")]
    Technology,
    #[serde(rename = "Programming")]
    #[sqlx(rename = "Programming")]
    Programming,
    #[serde(rename = "Web Development")]
    #[sqlx(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Mobile Development")]
    #[sqlx(rename = "Mobile Development")]
    MobileDevelopment,
    #[serde(rename = "AI & Machine Learning")]
    #[sqlx(rename = "AI & Machine Learning")]
    AiMachineLearning,
    #[serde(rename = "Data Science")]
    #[sqlx(rename = "Data Science")]
    DataScience,
    #[serde(rename = "Cybersecurity")]
    #[sqlx(rename = "Cybersecurity")]
    Cybersecurity,
    #[serde(rename = "Design & UX")]
    #[sqlx(rename = "Design & UX")]
    DesignUx,
    #[serde(rename = "Business")]
    #[sqlx(rename = "Business")]
    Business,
    #[serde(rename = "Startups")]
    #[sqlx(rename = "Startups")]
    Startups,
    #[serde(rename = "Productivity")]
    #[sqlx(rename = "Productivity")]
    Productivity,
    #[serde(rename = "Marketing")]
    #[sqlx(rename = "Marketing")]
    Marketing,
    #[serde(rename = "Finance")]
    #[sqlx(rename = "Finance")]
    Finance,
    #[serde(rename = "Health & Wellness")]
    #[sqlx(rename = "Health & Wellness")]
    HealthWellness,
    #[serde(rename = "Travel")]
    #[sqlx(rename = "Travel")]
    Travel,
    #[serde(rename = "Education")]
    #[sqlx(rename = "Education")]
    Education,
    #[serde(rename = "Gaming")]
    #[sqlx(rename = "Gaming")]
    Gaming,
    #[serde(rename = "Lifestyle")]
    #[sqlx(rename = "Lifestyle")]
    Lifestyle,
    #[serde(rename = "News")]
    #[sqlx(rename = "News")]
    News,
    #[serde(rename = "Opinion")]
    #[sqlx(rename = "Opinion")]
    Opinion,
}

impl Category {
    pub const ALL: [Category; 20] = [
        Category::Technology,
        Category::Programming,
        Category::WebDevelopment,
        Category::MobileDevelopment,
        Category::AiMachineLearning,
        Category::DataScience,
        Category::Cybersecurity,
        Category::DesignUx,
        Category::Business,
        Category::Startups,
        Category::Productivity,
        Category::Marketing,
        Category::Finance,
        Category::HealthWellness,
        Category::Travel,
        Category::Education,
        Category::Gaming,
        Category::Lifestyle,
        Category::News,
        Category::Opinion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Technology => "Technology",
            Category::Programming => "Programming",
            Category::WebDevelopment => "Web Development",
            Category::MobileDevelopment => "Mobile Development",
            Category::AiMachineLearning => "AI & Machine Learning",
            Category::DataScience => "Data Science",
            Category::Cybersecurity => "Cybersecurity",
            Category::DesignUx => "Design & UX",
            Category::Business => "Business",
            Category::Startups => "Startups",
            Category::Productivity => "Productivity",
            Category::Marketing => "Marketing",
            Category::Finance => "Finance",
            Category::HealthWellness => "Health & Wellness",
            Category::Travel => "Travel",
            Category::Education => "Education",
            Category::Gaming => "Gaming",
            Category::Lifestyle => "Lifestyle",
            Category::News => "News",
            Category::Opinion => "Opinion",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0} is not supported")]
pub struct UnknownCategory(pub String);

impl std::str::FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .ok_or_else(|| UnknownCategory(value.to_string()))
    }
}
