use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::leveling::PointAction;
use crate::models::{
    Commission, CommissionStatus, CommissionSummary, FeedKind, NewPromoCode, PromoCode, PromoQuote,
    MAX_MONEY,
};
use crate::repositories::{CommissionRepository, PromoCodeRepository, Redemption};
use crate::services::{FeedService, PointsService};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const GENERATED_CODE_LEN: usize = 8;
const GENERATE_ATTEMPTS: usize = 5;

/// Up to four letters or digits from the username, padded with random hex
pub fn generate_code(username: &str) -> String {
    let mut code: String = username
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(4)
        .collect::<String>()
        .to_ascii_uppercase();

    while code.len() < GENERATED_CODE_LEN {
        let random = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        code.extend(random.chars().take(GENERATED_CODE_LEN - code.len()));
    }
    code
}

pub fn validate_new_promo_code(new: &NewPromoCode) -> AppResult<()> {
    if !(1..=100).contains(&new.discount_percent) {
        return Err(AppError::Validation("discount_percent must be between 1 and 100".to_string()));
    }
    if !(0..=100).contains(&new.commission_percent) {
        return Err(AppError::Validation("commission_percent must be between 0 and 100".to_string()));
    }
    if matches!(new.max_uses, Some(max) if max < 1) {
        return Err(AppError::Validation("max_uses must be at least 1".to_string()));
    }
    if matches!(new.expires_at, Some(at) if at <= Utc::now()) {
        return Err(AppError::Validation("expires_at must be in the future".to_string()));
    }
    if let Some(code) = new.code.as_deref() {
        if !PromoCode::is_valid_format(&PromoCode::normalize(code)) {
            return Err(AppError::Validation(
                "Code must be 4-20 letters or digits".to_string(),
            ));
        }
    }
    Ok(())
}

pub fn validate_order_amount(amount: Decimal) -> AppResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation("Order amount must be greater than 0".to_string()));
    }
    if amount.scale() > 2 {
        return Err(AppError::Validation("Order amount can have at most 2 decimal places".to_string()));
    }
    if amount > MAX_MONEY {
        return Err(AppError::Validation(format!("Order amount cannot exceed {}", MAX_MONEY)));
    }
    Ok(())
}

/// Service for promo codes and creator commissions
pub struct PromoService {
    promo_repo: Arc<PromoCodeRepository>,
    commission_repo: Arc<CommissionRepository>,
    points_service: Arc<PointsService>,
    feed_service: Arc<FeedService>,
}

impl PromoService {
    pub fn new(
        promo_repo: Arc<PromoCodeRepository>,
        commission_repo: Arc<CommissionRepository>,
        points_service: Arc<PointsService>,
        feed_service: Arc<FeedService>,
    ) -> Self {
        Self {
            promo_repo,
            commission_repo,
            points_service,
            feed_service,
        }
    }

    pub async fn create(&self, creator: &AuthUser, new: &NewPromoCode) -> AppResult<PromoCode> {
        validate_new_promo_code(new)?;

        let code = match new.code.as_deref() {
            Some(code) => PromoCode::normalize(code),
            None => self.unused_generated_code(&creator.username).await?,
        };

        let promo = self
            .promo_repo
            .create(
                &code,
                creator.id,
                new.discount_percent,
                new.commission_percent,
                new.max_uses,
                new.expires_at,
            )
            .await?;

        info!("Created promo code {} for {}", promo.code, creator.id);
        Ok(promo)
    }

    async fn unused_generated_code(&self, username: &str) -> AppResult<String> {
        for _ in 0..GENERATE_ATTEMPTS {
            let code = generate_code(username);
            if !self.promo_repo.code_exists(&code).await? {
                return Ok(code);
            }
        }
        Err(AppError::Conflict("Could not generate a unique promo code, please pick one".to_string()))
    }

    pub async fn list_mine(&self, creator_id: Uuid) -> AppResult<Vec<PromoCode>> {
        Ok(self.promo_repo.list_by_creator(creator_id).await?)
    }

    /// Quote a code against an order without recording anything
    pub async fn validate(&self, code: &str, user_id: Uuid, order_amount: Decimal) -> AppResult<PromoQuote> {
        validate_order_amount(order_amount)?;

        let promo = self
            .promo_repo
            .find_by_code(&PromoCode::normalize(code))
            .await?
            .ok_or_else(|| AppError::NotFound("Promo code not found".to_string()))?;

        let already_used = self.promo_repo.has_used(promo.id, user_id).await?;
        promo
            .check_redeemable(user_id, already_used, Utc::now())
            .map_err(|rejection| AppError::BusinessLogic(rejection.message().to_string()))?;

        promo
            .quote(order_amount)
            .ok_or_else(|| AppError::Validation("Order amount is too large".to_string()))
    }

    /// Record a redemption and the creator's commission
    pub async fn redeem(&self, code: &str, redeemer: &AuthUser, order_amount: Decimal) -> AppResult<Redemption> {
        validate_order_amount(order_amount)?;

        let redemption = self
            .promo_repo
            .redeem(&PromoCode::normalize(code), redeemer.id, order_amount)
            .await?;

        let promo = &redemption.promo_code;
        info!(
            "Promo code {} redeemed by {}: discount {}, commission {}",
            promo.code, redeemer.id, redemption.usage.discount_amount, redemption.commission.amount
        );

        for (user_id, action) in [
            (redeemer.id, PointAction::RedeemPromoCode),
            (promo.creator_id, PointAction::PromoCodeReferral),
        ] {
            if let Err(e) = self.points_service.award(user_id, action).await {
                warn!("Failed to award {} points to {}: {}", action.as_str(), user_id, e);
            }
        }

        self.feed_service
            .publish(
                FeedKind::PromoRedeemed,
                Some(redeemer.id),
                &format!("{} used promo code {}", redeemer.username, promo.code),
                None,
                serde_json::json!({
                    "code": promo.code,
                    "discount_percent": promo.discount_percent,
                }),
            )
            .await;

        Ok(redemption)
    }

    pub async fn deactivate(&self, code_id: Uuid, actor: &AuthUser) -> AppResult<PromoCode> {
        let promo = self
            .promo_repo
            .find_by_id(code_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Promo code not found".to_string()))?;

        if promo.creator_id != actor.id && !actor.is_admin() {
            return Err(AppError::Forbidden("Only the creator can deactivate this code".to_string()));
        }

        let promo = self.promo_repo.deactivate(code_id).await?;
        info!("Deactivated promo code {} by {}", promo.code, actor.id);
        Ok(promo)
    }

    pub async fn commissions_mine(&self, creator_id: Uuid, status: Option<CommissionStatus>) -> AppResult<Vec<Commission>> {
        Ok(self.commission_repo.list_by_creator(creator_id, status).await?)
    }

    pub async fn commission_summary(&self, creator_id: Uuid) -> AppResult<CommissionSummary> {
        Ok(self.commission_repo.summary(creator_id).await?)
    }

    pub async fn mark_commission_paid(&self, commission_id: Uuid, admin: &AuthUser) -> AppResult<Commission> {
        let commission = self.commission_repo.mark_paid(commission_id).await?;
        info!("Commission {} marked paid by {}", commission_id, admin.id);
        Ok(commission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_code(code: Option<&str>) -> NewPromoCode {
        NewPromoCode {
            code: code.map(str::to_string),
            discount_percent: 10,
            commission_percent: 5,
            max_uses: Some(100),
            expires_at: None,
        }
    }

    #[test]
    fn test_generate_code_shape() {
        let code = generate_code("retro_rick");
        assert_eq!(code.len(), GENERATED_CODE_LEN);
        assert!(code.starts_with("RETR"));
        assert!(PromoCode::is_valid_format(&code));

        let code = generate_code("__");
        assert_eq!(code.len(), GENERATED_CODE_LEN);
        assert!(PromoCode::is_valid_format(&code));
    }

    #[test]
    fn test_validate_new_promo_code() {
        assert!(validate_new_promo_code(&new_code(Some("spring10"))).is_ok());
        assert!(validate_new_promo_code(&new_code(None)).is_ok());
        assert!(validate_new_promo_code(&new_code(Some("no"))).is_err());

        let mut bad = new_code(None);
        bad.discount_percent = 0;
        assert!(validate_new_promo_code(&bad).is_err());

        let mut bad = new_code(None);
        bad.commission_percent = 101;
        assert!(validate_new_promo_code(&bad).is_err());

        let mut bad = new_code(None);
        bad.max_uses = Some(0);
        assert!(validate_new_promo_code(&bad).is_err());
    }

    #[test]
    fn test_validate_order_amount() {
        assert!(validate_order_amount(Decimal::new(4999, 2)).is_ok());
        assert!(validate_order_amount(Decimal::ZERO).is_err());
        assert!(validate_order_amount(Decimal::new(-100, 2)).is_err());
        assert!(validate_order_amount(Decimal::new(1, 3)).is_err());
    }

    #[test]
    fn test_order_amount_upper_bound() {
        assert!(validate_order_amount(MAX_MONEY).is_ok());
        assert!(validate_order_amount(MAX_MONEY + Decimal::new(1, 2)).is_err());
        assert!(validate_order_amount(Decimal::new(10_000_000_000_000, 0)).is_err());
        assert!(matches!(
            validate_order_amount(Decimal::MAX),
            Err(AppError::Validation(_))
        ));
    }
}
