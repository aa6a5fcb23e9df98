//! Request and response bodies for center endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::{CenterAvailability, ListCentersResult};
use crate::domain::capacity::{Center, LockReason};
use crate::domain::foundation::{CenterId, CourseId, Timestamp};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCenterRequest {
    pub course_id: CourseId,
    pub name: String,
    pub capacity: u32,
    pub owner_contact: String,
    #[serde(default)]
    pub enrollment_deadline: Option<Timestamp>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetLockRequest {
    pub locked: bool,
}

/// A center as seen by administrators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CenterResponse {
    pub id: CenterId,
    pub course_id: CourseId,
    pub name: String,
    pub capacity: u32,
    pub current_enrollment: u32,
    pub is_locked: bool,
    pub enrollment_deadline: Option<Timestamp>,
    pub total_earnings: i64,
}

impl From<Center> for CenterResponse {
    fn from(c: Center) -> Self {
        Self {
            id: c.id,
            course_id: c.course_id,
            name: c.name,
            capacity: c.capacity,
            current_enrollment: c.current_enrollment,
            is_locked: c.is_locked,
            enrollment_deadline: c.enrollment_deadline,
            total_earnings: c.total_earnings,
        }
    }
}

/// A center as seen by a student picking a location.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CenterOptionResponse {
    pub id: CenterId,
    pub name: String,
    pub capacity: u32,
    pub spots_remaining: u32,
    pub is_locked: bool,
    pub lock_reason: Option<LockReason>,
    pub enrollment_deadline: Option<Timestamp>,
}

impl From<CenterAvailability> for CenterOptionResponse {
    fn from(a: CenterAvailability) -> Self {
        Self {
            id: a.center.id,
            name: a.center.name,
            capacity: a.center.capacity,
            spots_remaining: a.spots_remaining,
            is_locked: a.is_locked,
            lock_reason: a.lock_reason,
            enrollment_deadline: a.center.enrollment_deadline,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCentersResponse {
    pub course_id: CourseId,
    pub course_title: String,
    pub price: i64,
    pub course_locked: bool,
    pub centers: Vec<CenterOptionResponse>,
}

impl From<ListCentersResult> for CourseCentersResponse {
    fn from(result: ListCentersResult) -> Self {
        Self {
            course_id: result.course.id,
            course_title: result.course.title,
            price: result.course.price,
            course_locked: result.course_locked,
            centers: result.centers.into_iter().map(Into::into).collect(),
        }
    }
}
