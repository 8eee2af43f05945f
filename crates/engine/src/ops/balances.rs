use crate::{
    BalanceSummary, ExpenseFilter, FriendBalance, GroupBalance, ResultEngine, netting,
};

use super::{Engine, expenses::validate_filter};

impl Engine {
    /// Net balance with every counterparty of `user_id`, settled pairs
    /// omitted.
    pub async fn friend_balances(
        &self,
        user_id: &str,
        filter: &ExpenseFilter,
    ) -> ResultEngine<Vec<FriendBalance>> {
        validate_filter(filter)?;
        self.require_user(&self.database, user_id).await?;
        let expenses = self.load_involving(&self.database, user_id, filter).await?;
        Ok(netting::friend_balances(user_id, &expenses))
    }

    pub async fn group_balances(
        &self,
        user_id: &str,
        filter: &ExpenseFilter,
    ) -> ResultEngine<Vec<GroupBalance>> {
        validate_filter(filter)?;
        self.require_user(&self.database, user_id).await?;
        let expenses = self.load_involving(&self.database, user_id, filter).await?;
        Ok(netting::group_balances(user_id, &expenses))
    }

    /// Totals owed in each direction, for dashboards.
    pub async fn balance_summary(
        &self,
        user_id: &str,
        filter: &ExpenseFilter,
    ) -> ResultEngine<BalanceSummary> {
        let friends = self.friend_balances(user_id, filter).await?;
        Ok(netting::balance_summary(&friends))
    }
}
