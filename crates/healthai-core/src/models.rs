//! 核心数据模型定义
//!
//! `User` 是存储层的完整文档；`DashboardView` 是对外的投影，所有可选字段在这里统一补默认值。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{HealthError, Result};
use crate::severity;

pub const DEFAULT_AVATAR: &str = "https://randomuser.me/api/portraits/lego/1.jpg";
pub const DEFAULT_AGE: u32 = 20;

/// 严重程度等级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Low,
    #[serde(alias = "Medium")]
    Moderate,
    High,
}

/// 影像预测支持的疾病类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Disease {
    Alzheimer,
    Tumor,
    Parkinsons,
}

impl Disease {
    pub const ALL: [Disease; 3] = [Disease::Alzheimer, Disease::Tumor, Disease::Parkinsons];

    /// 路由段 / testType 标签
    pub fn as_str(&self) -> &'static str {
        match self {
            Disease::Alzheimer => "alzheimer",
            Disease::Tumor => "tumor",
            Disease::Parkinsons => "parkinsons",
        }
    }

    /// 展示名称，用于错误消息
    pub fn display_name(&self) -> &'static str {
        match self {
            Disease::Alzheimer => "Alzheimer",
            Disease::Tumor => "Tumor",
            Disease::Parkinsons => "Parkinson",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment.trim().to_ascii_lowercase().as_str() {
            "alzheimer" | "alzheimers" => Some(Disease::Alzheimer),
            "tumor" | "brain_tumor" => Some(Disease::Tumor),
            "parkinsons" | "parkinson" => Some(Disease::Parkinsons),
            _ => None,
        }
    }
}

/// 生命体征快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vitals {
    pub hr: u32,
    pub spo2: u32,
    pub temp: f64,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            hr: 75,
            spo2: 98,
            temp: 98.6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Condition {
    pub label: String,
    pub severity: Option<String>, // Mild / Moderate / Severe
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Medication {
    pub name: String,
    pub note: Option<String>,
}

/// 最近十次读数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeline {
    pub hr: Vec<f64>,
    pub spo2: Vec<f64>,
    pub sleep: Vec<f64>,
    pub allergy: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub name: String,
}

/// 最近一次检测摘要，始终等于最后一条检测结果的投影
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastScan {
    pub name: String,
    pub status: String,
    pub date: DateTime<Utc>,
}

impl From<&TestResult> for LastScan {
    fn from(result: &TestResult) -> Self {
        Self {
            name: result.test_type.clone(),
            status: result.result.clone(),
            date: result.date,
        }
    }
}

/// 检测结果，只属于所在用户，按列表位置标识
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_type: String,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub date: DateTime<Utc>,
}

/// 用户文档
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub height: Option<f64>, // cm
    pub weight: Option<f64>, // kg
    pub roll: Option<String>,
    pub department: Option<String>,
    pub emergency: Option<String>,
    pub avatar: Option<String>,
    pub vitals: Option<Vitals>,
    pub conditions: Vec<Condition>,
    pub medical_history: Vec<String>,
    pub medications: Vec<Medication>,
    pub test_results: Vec<TestResult>,
    pub timeline: Option<Timeline>,
    pub last_scan: Option<LastScan>,
    pub doctor: Option<Doctor>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String, age: u32, gender: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            age: Some(age),
            gender: Some(gender),
            created_at: Utc::now(),
            ..Default::default()
        }
    }

    /// 追加检测结果并同步 `last_scan`
    pub fn append_test_result(&mut self, result: TestResult) {
        self.last_scan = Some(LastScan::from(&result));
        self.test_results.push(result);
    }
}

/// 仪表盘视图：补齐默认值后的扁平用户资料，不含密码哈希
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub name: String,
    pub email: String,
    pub age: u32,
    pub gender: String,
    pub blood_group: String,
    pub height: f64,
    pub weight: f64,
    pub roll: String,
    pub department: String,
    pub emergency: String,
    pub avatar: String,
    pub vitals: Vitals,
    pub conditions: Vec<Condition>,
    pub medical_history: Vec<String>,
    pub medications: Vec<Medication>,
    pub test_results: Vec<TestResult>,
    pub timeline: Timeline,
    pub last_scan: LastScan,
    pub doctor: Doctor,
}

fn or_default(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

impl From<&User> for DashboardView {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            age: user.age.filter(|a| *a > 0).unwrap_or(DEFAULT_AGE),
            gender: or_default(&user.gender, "Not specified"),
            blood_group: or_default(&user.blood_group, "Unknown"),
            height: user.height.unwrap_or(0.0),
            weight: user.weight.unwrap_or(0.0),
            roll: or_default(&user.roll, "N/A"),
            department: or_default(&user.department, "N/A"),
            emergency: or_default(&user.emergency, "N/A"),
            avatar: or_default(&user.avatar, DEFAULT_AVATAR),
            vitals: user.vitals.clone().unwrap_or_default(),
            conditions: user.conditions.clone(),
            medical_history: user.medical_history.clone(),
            medications: user.medications.clone(),
            test_results: user.test_results.clone(),
            timeline: user.timeline.clone().unwrap_or_default(),
            last_scan: user.last_scan.clone().unwrap_or_else(|| LastScan {
                name: "None".to_string(),
                status: "N/A".to_string(),
                date: Utc::now(),
            }),
            doctor: user.doctor.clone().unwrap_or_else(|| Doctor {
                name: "Not assigned".to_string(),
            }),
        }
    }
}

/// 资料部分更新。未知字段忽略；邮箱、密码和检测记录不可通过此处修改。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub roll: Option<String>,
    pub department: Option<String>,
    pub emergency: Option<String>,
    pub avatar: Option<String>,
    pub vitals: Option<Vitals>,
    pub conditions: Option<Vec<Condition>>,
    pub medical_history: Option<Vec<String>>,
    pub medications: Option<Vec<Medication>>,
    pub timeline: Option<Timeline>,
    pub doctor: Option<Doctor>,
}

impl ProfileUpdate {
    /// 从任意JSON解析，类型不匹配视为验证错误
    pub fn from_json(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(HealthError::Validation(
                "Profile update must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| HealthError::Validation(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(HealthError::Validation("name cannot be empty".to_string()));
            }
        }
        if let Some(age) = self.age {
            if age == 0 || age > 150 {
                return Err(HealthError::Validation(format!("age out of range: {}", age)));
            }
        }
        for (field, value) in [("height", self.height), ("weight", self.weight)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(HealthError::Validation(format!("{} must be non-negative", field)));
                }
            }
        }
        if let Some(vitals) = &self.vitals {
            if !vitals.temp.is_finite() || vitals.temp < 0.0 {
                return Err(HealthError::Validation(
                    "vitals.temp must be non-negative".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// 合并到用户文档，只覆盖提供的字段
    pub fn apply(self, user: &mut User) {
        if let Some(v) = self.name {
            user.name = v;
        }
        if let Some(v) = self.age {
            user.age = Some(v);
        }
        if let Some(v) = self.gender {
            user.gender = Some(v);
        }
        if let Some(v) = self.blood_group {
            user.blood_group = Some(v);
        }
        if let Some(v) = self.height {
            user.height = Some(v);
        }
        if let Some(v) = self.weight {
            user.weight = Some(v);
        }
        if let Some(v) = self.roll {
            user.roll = Some(v);
        }
        if let Some(v) = self.department {
            user.department = Some(v);
        }
        if let Some(v) = self.emergency {
            user.emergency = Some(v);
        }
        if let Some(v) = self.avatar {
            user.avatar = Some(v);
        }
        if let Some(v) = self.vitals {
            user.vitals = Some(v);
        }
        if let Some(v) = self.conditions {
            user.conditions = v;
        }
        if let Some(v) = self.medical_history {
            user.medical_history = v;
        }
        if let Some(v) = self.medications {
            user.medications = v;
        }
        if let Some(v) = self.timeline {
            user.timeline = Some(v);
        }
        if let Some(v) = self.doctor {
            user.doctor = Some(v);
        }
    }
}

/// 追加检测结果的请求体
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewTestResult {
    pub test_type: Option<String>,
    pub result: Option<String>,
    pub confidence: Option<f64>,
    pub severity: Option<Severity>,
    pub details: Option<Value>,
}

impl NewTestResult {
    /// 校验必填字段；未提供严重程度时根据标签推导
    pub fn into_test_result(self) -> Result<TestResult> {
        let test_type = self
            .test_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| HealthError::Validation("testType is required".to_string()))?;
        let result = self
            .result
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or_else(|| HealthError::Validation("result is required".to_string()))?;

        let severity = self
            .severity
            .unwrap_or_else(|| severity::classify_test(&test_type, &result));

        Ok(TestResult {
            test_type,
            result,
            confidence: self.confidence,
            severity: Some(severity),
            details: self.details,
            date: Utc::now(),
        })
    }
}
